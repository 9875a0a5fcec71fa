//! SHIORI Manager
//!
//! Discovers engine binaries inside a ghost package, ranks them by family
//! priority, keeps at most one engine active, and routes protocol traffic to it.
//!
//! Lock order is always `active` slot, then the engine mutex. Request routing
//! holds the slot only long enough to grab the engine; a request that finds
//! the engine already held is rejected with [`ShioriError::EngineBusy`].

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::{capabilities_of, default_version_of, priority_of, Capabilities, EngineFamily};
use crate::config::ShioriConfig;
use crate::engine::{DebugInfo, EngineInstance, EngineSettings};
use crate::error::{ShioriError, ShioriResult};
use crate::ghost::{self, GhostEntry, GhostProfile};
use crate::host::{Clock, Collaborators, PackageInspector, RandomSource};
use crate::protocol::{build_request, Response};

/// Lifecycle of a detected engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorStatus {
    Detected,
    Loading,
    Loaded,
    Error,
}

/// An engine binary found by [`ShioriManager::detect`], not yet loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    pub id: String,
    pub family: EngineFamily,
    pub file_name: String,
    pub path: PathBuf,
    pub version: String,
    pub capabilities: Capabilities,
    pub status: DescriptorStatus,
    pub last_modified: DateTime<Utc>,
}

impl EngineDescriptor {
    pub fn priority(&self) -> u32 {
        priority_of(self.family)
    }
}

/// Shared handle to an engine instance.
///
/// The manager keeps one for routing; callers may hold clones for inspection.
/// Holding [`EngineHandle::lock`] counts as an in-flight call: routed requests
/// are rejected as busy and engine switches wait until the guard drops.
#[derive(Clone)]
pub struct EngineHandle {
    descriptor_id: Arc<str>,
    family: EngineFamily,
    ghost_path: Option<Arc<Path>>,
    inner: Arc<Mutex<EngineInstance>>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("descriptor_id", &self.descriptor_id)
            .field("family", &self.family)
            .finish()
    }
}

impl EngineHandle {
    fn new(descriptor_id: &str, ghost_path: Option<&Path>, instance: EngineInstance) -> Self {
        Self {
            descriptor_id: Arc::from(descriptor_id),
            family: instance.family(),
            ghost_path: ghost_path.map(Arc::from),
            inner: Arc::new(Mutex::new(instance)),
        }
    }

    pub fn descriptor_id(&self) -> &str {
        &self.descriptor_id
    }

    pub fn family(&self) -> EngineFamily {
        self.family
    }

    /// Package the engine was detected in.
    pub fn ghost_path(&self) -> Option<&Path> {
        self.ghost_path.as_deref()
    }

    /// Exclusive access to the instance. Blocks while a request is in flight.
    ///
    /// No [`ShioriManager`] method may be called while the guard is alive:
    /// manager calls take the active slot, and an engine switch holds that
    /// slot while it waits for this guard, so the two would deadlock.
    pub fn lock(&self) -> MutexGuard<'_, EngineInstance> {
        self.inner.lock()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().is_loaded()
    }

    pub fn get_variable(&self, name: &str) -> serde_json::Value {
        self.inner.lock().get_variable(name)
    }

    pub fn set_variable(&self, name: &str, value: impl Into<serde_json::Value>) -> serde_json::Value {
        self.inner.lock().set_variable(name, value)
    }

    pub fn debug_info(&self) -> DebugInfo {
        self.inner.lock().debug_info()
    }

    pub fn same_instance(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Engine registry and router for one session.
pub struct ShioriManager {
    config: ShioriConfig,
    inspector: Arc<dyn PackageInspector>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    registry: RwLock<Vec<EngineDescriptor>>,
    catalog: RwLock<BTreeMap<String, GhostEntry>>,
    profile: RwLock<Option<GhostProfile>>,
    ghost_path: RwLock<Option<PathBuf>>,
    active: Mutex<Option<EngineHandle>>,
}

impl ShioriManager {
    /// Manager over the real filesystem, system clock, and thread RNG.
    pub fn new(config: ShioriConfig) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: ShioriConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            inspector: collaborators.inspector,
            clock: collaborators.clock,
            random: collaborators.random,
            registry: RwLock::new(Vec::new()),
            catalog: RwLock::new(BTreeMap::new()),
            profile: RwLock::new(None),
            ghost_path: RwLock::new(None),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ShioriConfig {
        &self.config
    }

    /// Scan a ghost package for engine binaries and replace the registry.
    ///
    /// Returns descriptors ordered by family priority, ties in discovery order.
    /// Finding nothing is an empty list; only I/O faults are errors.
    /// Unrecognized `.dll` files are logged at `warn`, any other file at `debug`.
    pub fn detect(&self, ghost_path: impl AsRef<Path>) -> ShioriResult<Vec<EngineDescriptor>> {
        let ghost_path = ghost_path.as_ref();
        tracing::info!(ghost_path = %ghost_path.display(), "SHIORI detection started");

        let candidates = self.inspector.list_candidate_paths(ghost_path).map_err(|e| {
            tracing::error!(ghost_path = %ghost_path.display(), error = %e, "SHIORI detection failed");
            ShioriError::Detection(e)
        })?;
        let profile = GhostProfile::read(self.inspector.as_ref(), ghost_path)?;

        let mut used_ids = HashSet::new();
        let mut detected = Vec::new();
        for path in candidates {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let Some(family) = EngineFamily::from_binary_name(&file_name) else {
                if is_library(&path) {
                    tracing::warn!(file = %file_name, path = %path.display(), "unsupported SHIORI binary skipped");
                } else {
                    tracing::debug!(file = %file_name, path = %path.display(), "non-engine file skipped");
                }
                continue;
            };

            let discovered_at = self.clock.now();
            let id = unique_id(&mut used_ids, family, discovered_at);
            tracing::info!(id = %id, family = %family, path = %path.display(), "SHIORI binary detected");
            detected.push(EngineDescriptor {
                id,
                family,
                file_name,
                path,
                version: default_version_of(family).to_string(),
                capabilities: capabilities_of(family),
                status: DescriptorStatus::Detected,
                last_modified: discovered_at,
            });
        }

        // Stable: equal priorities keep discovery order.
        detected.sort_by(|a, b| b.priority().cmp(&a.priority()));

        *self.registry.write() = detected.clone();
        *self.profile.write() = profile;
        *self.ghost_path.write() = Some(ghost_path.to_path_buf());

        tracing::info!(count = detected.len(), "SHIORI detection finished");
        Ok(detected)
    }

    /// Find every ghost package under `root` and replace the catalog.
    pub fn scan_ghosts(&self, root: impl AsRef<Path>) -> ShioriResult<Vec<GhostEntry>> {
        let root = root.as_ref();
        let catalog = ghost::scan_ghosts(self.inspector.as_ref(), root).map_err(|e| {
            tracing::error!(root = %root.display(), error = %e, "ghost scan failed");
            ShioriError::Detection(e)
        })?;
        tracing::info!(root = %root.display(), count = catalog.len(), "ghost scan finished");
        let entries = catalog.values().cloned().collect();
        *self.catalog.write() = catalog;
        Ok(entries)
    }

    /// Catalog from the last [`ShioriManager::scan_ghosts`], by name.
    pub fn ghosts(&self) -> Vec<GhostEntry> {
        self.catalog.read().values().cloned().collect()
    }

    pub fn ghost(&self, name: &str) -> Option<GhostEntry> {
        self.catalog.read().get(name).cloned()
    }

    /// Run [`ShioriManager::detect`] on the cataloged ghost `name`.
    pub fn detect_ghost(&self, name: &str) -> ShioriResult<Vec<EngineDescriptor>> {
        let entry = self
            .ghost(name)
            .ok_or_else(|| ShioriError::UnknownGhost(name.to_string()))?;
        self.detect(&entry.path)
    }

    /// Detect the cataloged ghost `name` and load its preferred engine.
    pub fn load_ghost(&self, name: &str) -> ShioriResult<EngineHandle> {
        self.detect_ghost(name)?;
        self.load_preferred()
    }

    /// Catalog name of the ghost whose engine is active.
    pub fn current_ghost(&self) -> Option<String> {
        let active = self.active()?;
        let path = active.ghost_path()?;
        let catalog = self.catalog.read();
        let name = catalog
            .values()
            .find(|entry| entry.path == path)
            .map(|entry| entry.name.clone());
        name
    }

    /// Load the descriptor `id` and make it the active engine.
    ///
    /// A still-loaded previous engine is unloaded first, in the same step,
    /// after any in-flight request on it completes. Must not be called while
    /// the caller holds an [`EngineHandle::lock`] guard.
    pub fn load(&self, id: &str) -> ShioriResult<EngineHandle> {
        let mut active = self.active.lock();

        let (family, version, path) = {
            let registry = self.registry.read();
            let descriptor = registry
                .iter()
                .find(|d| d.id == id)
                .ok_or_else(|| ShioriError::UnknownDescriptor(id.to_string()))?;
            (descriptor.family, descriptor.version.clone(), descriptor.path.clone())
        };

        if let Some(previous) = active.take() {
            self.retire(&previous);
        }

        tracing::info!(id, family = %family, "loading SHIORI engine");
        self.set_status(id, DescriptorStatus::Loading);

        if !self.inspector.file_exists(&path) {
            self.set_status(id, DescriptorStatus::Error);
            let reason = format!("engine binary missing: {}", path.display());
            tracing::error!(id, reason = %reason, "SHIORI load failed");
            return Err(ShioriError::LoadFailed {
                id: id.to_string(),
                reason,
            });
        }

        let settings = EngineSettings::from_config(&self.config, self.profile.read().as_ref());
        let instance = EngineInstance::new(
            family,
            version,
            &settings,
            Arc::clone(&self.clock),
            Arc::clone(&self.random),
        );
        let handle = EngineHandle::new(id, self.ghost_path.read().as_deref(), instance);
        self.set_status(id, DescriptorStatus::Loaded);

        if self.config.boot_on_load {
            let mut engine = handle.lock();
            log_lifecycle_event(&mut engine, "OnBoot");
        }

        *active = Some(handle.clone());
        tracing::info!(id, family = %family, "SHIORI engine loaded");
        Ok(handle)
    }

    /// Load the highest-priority descriptor that has not failed.
    pub fn load_preferred(&self) -> ShioriResult<EngineHandle> {
        let id = self
            .registry
            .read()
            .iter()
            .find(|d| d.status != DescriptorStatus::Error)
            .map(|d| d.id.clone())
            .ok_or(ShioriError::NoActiveEngine)?;
        self.load(&id)
    }

    /// Route a raw request to the active engine.
    pub fn send_request(&self, raw: &str) -> ShioriResult<String> {
        let handle;
        let mut engine = {
            let slot = self.active.lock();
            handle = slot.clone().ok_or(ShioriError::NoActiveEngine)?;
            handle.inner.try_lock().ok_or(ShioriError::EngineBusy)?
        };
        engine.process(raw)
    }

    /// Build a `GET SHIORI/3.0` request for `event` and route it.
    pub fn dispatch(&self, event: &str, references: &[&str]) -> ShioriResult<String> {
        self.send_request(&build_request(event, references))
    }

    pub fn on_mouse_click(&self, x: i32, y: i32, part: &str) -> ShioriResult<String> {
        self.dispatch("OnMouseClick", &[&x.to_string(), &y.to_string(), part])
    }

    pub fn on_second_change(&self) -> ShioriResult<String> {
        self.dispatch("OnSecondChange", &[])
    }

    pub fn on_minute_change(&self, minute: u32) -> ShioriResult<String> {
        self.dispatch("OnMinuteChange", &[&minute.to_string()])
    }

    /// Unload the active engine, if any.
    pub fn unload_active(&self) {
        let mut active = self.active.lock();
        if let Some(handle) = active.take() {
            self.retire(&handle);
        }
    }

    /// Snapshot of the last detection, in priority order.
    pub fn detected(&self) -> Vec<EngineDescriptor> {
        self.registry.read().clone()
    }

    pub fn descriptor(&self, id: &str) -> Option<EngineDescriptor> {
        self.registry.read().iter().find(|d| d.id == id).cloned()
    }

    pub fn active(&self) -> Option<EngineHandle> {
        self.active.lock().clone()
    }

    pub fn ghost_path(&self) -> Option<PathBuf> {
        self.ghost_path.read().clone()
    }

    pub fn ghost_profile(&self) -> Option<GhostProfile> {
        self.profile.read().clone()
    }

    /// Drop every descriptor. The active engine, if any, keeps running.
    pub fn clear_detected(&self) {
        self.registry.write().clear();
    }

    /// Unload `handle` once its in-flight request (if any) is done.
    fn retire(&self, handle: &EngineHandle) {
        let mut engine = handle.lock();
        if engine.is_loaded() {
            if self.config.close_on_unload {
                log_lifecycle_event(&mut engine, "OnClose");
            }
            engine.unload();
        }
        drop(engine);

        if self
            .descriptor(handle.descriptor_id())
            .is_some_and(|d| d.status == DescriptorStatus::Loaded)
        {
            self.set_status(handle.descriptor_id(), DescriptorStatus::Detected);
        }
        tracing::info!(id = handle.descriptor_id(), "SHIORI engine unloaded");
    }

    fn set_status(&self, id: &str, status: DescriptorStatus) {
        if let Some(descriptor) = self.registry.write().iter_mut().find(|d| d.id == id) {
            descriptor.status = status;
        }
    }
}

/// Send a lifecycle event and log what came back; failures never propagate.
fn log_lifecycle_event(engine: &mut EngineInstance, event: &str) {
    match engine.process(&build_request(event, &[])) {
        Ok(raw) => match Response::parse(&raw) {
            Ok(response) => tracing::info!(
                event,
                status = response.status,
                value = response.value().unwrap_or_default(),
                "lifecycle event answered"
            ),
            Err(e) => tracing::warn!(event, error = %e, "lifecycle event returned unreadable response"),
        },
        Err(e) => tracing::warn!(event, error = %e, "lifecycle event failed"),
    }
}

/// `<family>_<millis>`, suffixed `_<n>` on a collision within one detection run.
fn unique_id(used: &mut HashSet<String>, family: EngineFamily, at: DateTime<Utc>) -> String {
    let base = format!("{}_{}", family, at.timestamp_millis());
    let mut id = base.clone();
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{}_{}", base, n);
        n += 1;
    }
    used.insert(id.clone());
    id
}

fn is_library(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dll"))
}
