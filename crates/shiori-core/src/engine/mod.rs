//! Engine instances: one loaded dialogue engine with its variables, history, and family policy.

pub mod expr;
pub mod generic;
pub mod satoriya;
mod variables;
pub mod yaya;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::capability::EngineFamily;
use crate::config::ShioriConfig;
use crate::error::{ShioriError, ShioriResult};
use crate::ghost::GhostProfile;
use crate::host::{Clock, RandomSource};
use crate::protocol::{Request, Response};

pub use satoriya::{PoolStats, SatoriyaPolicy};
pub use variables::{VariableStore, VAR_GHOST_NAME, VAR_REQUEST_COUNTER, VAR_SYSTEM_VERSION, VAR_USERNAME};
pub use yaya::{YayaEvent, YayaFunction, YayaPolicy};

/// Pick a phrase through the injected random source.
pub(crate) fn pick<'a, S: AsRef<str>>(pool: &'a [S], random: &dyn RandomSource) -> ShioriResult<&'a str> {
    let index = random.next_index(pool.len());
    pool.get(index)
        .map(AsRef::as_ref)
        .ok_or(ShioriError::InvalidIndex { index, len: pool.len() })
}

fn unsupported(family: EngineFamily, operation: &'static str) -> ShioriError {
    ShioriError::Unsupported { family, operation }
}

/// Per-load settings derived from config and the ghost profile.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub ghost_name: String,
    pub username: String,
    /// `None` keeps every history entry.
    pub history_limit: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ShioriConfig::default(), None)
    }
}

impl EngineSettings {
    pub fn from_config(config: &ShioriConfig, profile: Option<&GhostProfile>) -> Self {
        let ghost_name = profile
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| config.ghost_name.clone());
        Self {
            ghost_name,
            username: config.username.clone(),
            history_limit: config.history_cap(),
        }
    }
}

/// One processed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub request: Request,
    pub response: Response,
}

/// Read-only diagnostic snapshot of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub family: EngineFamily,
    pub version: String,
    pub loaded: bool,
    pub variable_count: usize,
    pub event_history_count: usize,
    pub last_event: Option<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_pattern_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_stats: Option<BTreeMap<String, PoolStats>>,
}

#[derive(Debug, Clone)]
enum FamilyPolicy {
    Yaya(YayaPolicy),
    Satoriya(SatoriyaPolicy),
    Generic,
}

impl FamilyPolicy {
    fn for_family(family: EngineFamily) -> Self {
        match family {
            EngineFamily::Yaya => FamilyPolicy::Yaya(YayaPolicy::default()),
            EngineFamily::Satoriya => FamilyPolicy::Satoriya(SatoriyaPolicy::default()),
            EngineFamily::Generic => FamilyPolicy::Generic,
        }
    }
}

/// A loaded dialogue engine.
///
/// Owns its variable store, request counter, and history exclusively; callers
/// only reach them through the methods below.
pub struct EngineInstance {
    family: EngineFamily,
    version: String,
    loaded: bool,
    variables: VariableStore,
    history: VecDeque<HistoryEntry>,
    history_limit: Option<usize>,
    policy: FamilyPolicy,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for EngineInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInstance")
            .field("family", &self.family)
            .field("version", &self.version)
            .field("loaded", &self.loaded)
            .field("variables", &self.variables.len())
            .field("history", &self.history.len())
            .finish()
    }
}

impl EngineInstance {
    pub fn new(
        family: EngineFamily,
        version: impl Into<String>,
        settings: &EngineSettings,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let version = version.into();
        let mut variables = VariableStore::default();
        variables.set(VAR_SYSTEM_VERSION, Value::String(version.clone()));
        variables.set(VAR_GHOST_NAME, Value::String(settings.ghost_name.clone()));
        variables.set(VAR_REQUEST_COUNTER, Value::from(0u64));
        variables.set(VAR_USERNAME, Value::String(settings.username.clone()));
        if family == EngineFamily::Yaya {
            variables.set("talking.mode", Value::String("normal".to_string()));
        }

        tracing::info!(family = %family, version = %version, ghost = %settings.ghost_name, "engine instance created");

        Self {
            family,
            version,
            loaded: true,
            variables,
            history: VecDeque::new(),
            history_limit: settings.history_limit,
            policy: FamilyPolicy::for_family(family),
            clock,
            random,
        }
    }

    pub fn family(&self) -> EngineFamily {
        self.family
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Handle one raw request and return the raw response.
    ///
    /// Once loaded this never fails: parse errors and handler failures become
    /// 500 responses with an `Error` header. Malformed requests still count
    /// but leave no history entry.
    pub fn process(&mut self, raw: &str) -> ShioriResult<String> {
        self.ensure_loaded()?;
        let counter = self.variables.bump_request_counter();

        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(family = %self.family, counter, error = %e, "rejecting malformed request");
                return Ok(Response::error(e.to_string()).to_wire());
            }
        };

        let response = match self.respond(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(family = %self.family, event = %request.event, error = %e, "event handler failed");
                Response::error(e.to_string())
            }
        };
        tracing::debug!(family = %self.family, event = %request.event, status = response.status, counter, "processed request");

        let wire = response.to_wire();
        self.record(request, response);
        Ok(wire)
    }

    fn respond(&self, request: &Request) -> ShioriResult<Response> {
        match &self.policy {
            FamilyPolicy::Yaya(policy) => policy.respond(request, self.random.as_ref()),
            FamilyPolicy::Satoriya(policy) => policy.respond(request, self.random.as_ref()),
            FamilyPolicy::Generic => Ok(generic::respond(request)),
        }
    }

    fn record(&mut self, request: Request, response: Response) {
        self.history.push_back(HistoryEntry {
            timestamp: self.clock.now(),
            request,
            response,
        });
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    fn ensure_loaded(&self) -> ShioriResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(ShioriError::NotLoaded)
        }
    }

    /// Value of `name`, empty string when absent.
    pub fn get_variable(&self, name: &str) -> Value {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) -> Value {
        self.variables.set(name, value.into())
    }

    pub fn request_counter(&self) -> u64 {
        self.variables
            .raw(VAR_REQUEST_COUNTER)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.iter().cloned().collect()
    }

    /// Call a YAYA built-in (`GET`, `SET`, `EVAL`, ...).
    pub fn call_function(&mut self, name: &str, args: &[&str]) -> ShioriResult<String> {
        self.ensure_loaded()?;
        match &self.policy {
            FamilyPolicy::Yaya(policy) => policy.call_function(name, args, &mut self.variables),
            _ => Err(unsupported(self.family, "callFunction")),
        }
    }

    pub fn add_response(&mut self, event: &str, phrase: &str) -> ShioriResult<()> {
        self.ensure_loaded()?;
        match &mut self.policy {
            FamilyPolicy::Satoriya(policy) => {
                policy.add_response(event, phrase);
                Ok(())
            }
            _ => Err(unsupported(self.family, "addResponse")),
        }
    }

    pub fn remove_response(&mut self, event: &str, phrase: &str) -> ShioriResult<bool> {
        self.ensure_loaded()?;
        match &mut self.policy {
            FamilyPolicy::Satoriya(policy) => Ok(policy.remove_response(event, phrase)),
            _ => Err(unsupported(self.family, "removeResponse")),
        }
    }

    pub fn responses_for(&self, event: &str) -> ShioriResult<Vec<String>> {
        match &self.policy {
            FamilyPolicy::Satoriya(policy) => Ok(policy.responses_for(event)),
            _ => Err(unsupported(self.family, "responsesFor")),
        }
    }

    pub fn all_responses(&self) -> ShioriResult<BTreeMap<String, Vec<String>>> {
        match &self.policy {
            FamilyPolicy::Satoriya(policy) => Ok(policy.all_responses()),
            _ => Err(unsupported(self.family, "allResponses")),
        }
    }

    pub fn debug_info(&self) -> DebugInfo {
        let (function_count, response_pattern_count, response_stats) = match &self.policy {
            FamilyPolicy::Yaya(policy) => (Some(policy.function_count()), None, None),
            FamilyPolicy::Satoriya(policy) => (None, Some(policy.pattern_count()), Some(policy.stats())),
            FamilyPolicy::Generic => (None, None, None),
        };
        DebugInfo {
            family: self.family,
            version: self.version.clone(),
            loaded: self.loaded,
            variable_count: self.variables.len(),
            event_history_count: self.history.len(),
            last_event: self.history.back().cloned(),
            function_count,
            response_pattern_count,
            response_stats,
        }
    }

    /// Clear variables, tables, and history. Idempotent.
    pub fn unload(&mut self) {
        if self.loaded {
            tracing::info!(family = %self.family, requests = self.request_counter(), "unloading engine instance");
        }
        self.variables.clear();
        match &mut self.policy {
            FamilyPolicy::Yaya(policy) => policy.clear(),
            FamilyPolicy::Satoriya(policy) => policy.clear(),
            FamilyPolicy::Generic => {}
        }
        self.history.clear();
        self.loaded = false;
    }
}
