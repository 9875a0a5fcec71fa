//! Error types for SHIORI detection, loading, and dispatch.

use thiserror::Error;

use crate::capability::EngineFamily;

/// Result type alias for SHIORI operations
pub type ShioriResult<T> = Result<T, ShioriError>;

/// Errors surfaced by the codec, engine instances, and the manager.
#[derive(Error, Debug)]
pub enum ShioriError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("engine is not loaded")]
    NotLoaded,

    #[error("unknown engine descriptor: {0}")]
    UnknownDescriptor(String),

    #[error("ghost not found in catalog: {0}")]
    UnknownGhost(String),

    #[error("failed to load engine {id}: {reason}")]
    LoadFailed { id: String, reason: String },

    #[error("no SHIORI engine is active")]
    NoActiveEngine,

    #[error("engine is busy with another request")]
    EngineBusy,

    #[error("detection error: {0}")]
    Detection(#[from] std::io::Error),

    #[error("{operation} is not supported by {family} engines")]
    Unsupported {
        family: EngineFamily,
        operation: &'static str,
    },

    #[error("function not found: {0}")]
    UnknownFunction(String),

    #[error("expression error: {0}")]
    Expression(String),

    #[error("random index {index} out of range for pool of {len}")]
    InvalidIndex { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),
}
