//! Host configuration loaded from environment or a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ShioriError, ShioriResult};

fn default_ghost_name() -> String {
    "mock_nanai".to_string()
}

fn default_username() -> String {
    "ユーザー".to_string()
}

fn default_history_limit() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_random_talk_secs() -> u64 {
    60
}

/// SHIORI host configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | SHIORI_GHOST_PATH | unset | Ghost package root driven by the daemon. |
/// | SHIORI_GHOST_NAME | mock_nanai | `system.ghost.name` when descript.txt has no name. |
/// | SHIORI_USERNAME | ユーザー | Initial `username` variable. |
/// | SHIORI_HISTORY_LIMIT | 256 | Event history entries kept per engine (0 = unbounded). |
/// | SHIORI_BOOT_ON_LOAD | false | Send OnBoot right after a successful load. |
/// | SHIORI_CLOSE_ON_UNLOAD | true | Send OnClose before unloading the active engine. |
/// | SHIORI_RANDOM_TALK_SECS | 60 | Daemon OnRandom interval (0 = never). |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShioriConfig {
    #[serde(default)]
    pub ghost_path: Option<PathBuf>,
    #[serde(default = "default_ghost_name")]
    pub ghost_name: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub boot_on_load: bool,
    #[serde(default = "default_true")]
    pub close_on_unload: bool,
    #[serde(default = "default_random_talk_secs")]
    pub random_talk_secs: u64,
}

impl Default for ShioriConfig {
    fn default() -> Self {
        Self {
            ghost_path: None,
            ghost_name: default_ghost_name(),
            username: default_username(),
            history_limit: default_history_limit(),
            boot_on_load: false,
            close_on_unload: true,
            random_talk_secs: default_random_talk_secs(),
        }
    }
}

impl ShioriConfig {
    /// Load from environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ghost_path: env_opt_string("SHIORI_GHOST_PATH").map(PathBuf::from),
            ghost_name: env_opt_string("SHIORI_GHOST_NAME").unwrap_or(defaults.ghost_name),
            username: env_opt_string("SHIORI_USERNAME").unwrap_or(defaults.username),
            history_limit: env_parse("SHIORI_HISTORY_LIMIT", defaults.history_limit),
            boot_on_load: env_bool("SHIORI_BOOT_ON_LOAD", defaults.boot_on_load),
            close_on_unload: env_bool("SHIORI_CLOSE_ON_UNLOAD", defaults.close_on_unload),
            random_talk_secs: env_parse("SHIORI_RANDOM_TALK_SECS", defaults.random_talk_secs),
        }
    }

    /// Load from a TOML file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> ShioriResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| ShioriError::Config(format!("read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| ShioriError::Config(format!("parse {}: {}", path.display(), e)))
    }

    /// `None` when history is unbounded.
    pub fn history_cap(&self) -> Option<usize> {
        (self.history_limit > 0).then_some(self.history_limit)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                default
            } else {
                v.eq_ignore_ascii_case("true") || v == "1"
            }
        }
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
