//! # shiori-core
//!
//! Engine detection and SHIORI/3.0 protocol dispatch for desktop mascot ghosts.
//!
//! ```text
//! ShioriManager::detect(ghost)  ──► [EngineDescriptor] (ranked by capability table)
//!            │
//!            ▼ load(id)
//!      EngineInstance (Yaya | Satoriya | Generic policy)
//!            ▲
//!  send_request(raw) ──► protocol::parse ──► policy ──► protocol::format ──► raw
//! ```
//!
//! Real engine binaries are never executed; each family is answered by an
//! in-process policy that speaks the same wire protocol.

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod ghost;
pub mod host;
pub mod manager;
pub mod protocol;

pub use capability::{capabilities_of, priority_of, Capabilities, EngineFamily};
pub use config::ShioriConfig;
pub use engine::{DebugInfo, EngineInstance, EngineSettings, HistoryEntry};
pub use error::{ShioriError, ShioriResult};
pub use ghost::{GhostEntry, GhostProfile};
pub use host::{
    Clock, Collaborators, FixedClock, FsInspector, PackageInspector, RandomSource, ScriptedRandom, SystemClock,
    ThreadRandom,
};
pub use manager::{DescriptorStatus, EngineDescriptor, EngineHandle, ShioriManager};
pub use protocol::{build_request, format_response, Request, Response};
