//! SHIORI Ghost Daemon
//!
//! Detects the engines of one ghost package, loads the preferred one, and
//! drives it with clock events until interrupted.

use chrono::Timelike;
use shiori_core::{Response, ShioriConfig, ShioriError, ShioriManager};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Clock events are sent once per second.
const TICK_SECS: u64 = 1;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[shiori-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::var("SHIORI_CONFIG") {
        Ok(path) => match ShioriConfig::load_from_path(&PathBuf::from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "could not read config");
                return;
            }
        },
        Err(_) => ShioriConfig::from_env(),
    };

    let Some(ghost_path) = config.ghost_path.clone() else {
        tracing::error!("SHIORI_GHOST_PATH is not set; nothing to run");
        return;
    };
    let random_talk_secs = config.random_talk_secs;
    let manager = ShioriManager::new(config);

    match manager.detect(&ghost_path) {
        Ok(detected) => {
            for descriptor in &detected {
                tracing::info!(
                    id = %descriptor.id,
                    family = %descriptor.family,
                    priority = descriptor.priority(),
                    "candidate engine"
                );
            }
        }
        Err(e) => {
            tracing::error!(ghost_path = %ghost_path.display(), error = %e, "detection failed");
            return;
        }
    }

    let handle = match manager.load_preferred() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(ghost_path = %ghost_path.display(), error = %e, "no engine could be loaded");
            return;
        }
    };

    tracing::info!(
        id = handle.descriptor_id(),
        family = %handle.family(),
        ghost = handle.get_variable("system.ghost.name").as_str().unwrap_or_default(),
        random_talk_secs,
        "SHIORI daemon started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(TICK_SECS));
    let mut last_minute: Option<u32> = None;
    let mut elapsed_secs: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick(&manager, &mut last_minute, &mut elapsed_secs, random_talk_secs);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down daemon");
                break;
            }
        }
    }

    if let Some(active) = manager.active() {
        match serde_json::to_string(&active.debug_info()) {
            Ok(info) => tracing::info!(debug_info = %info, "final engine state"),
            Err(e) => tracing::warn!(error = %e, "could not serialize engine state"),
        }
    }
    manager.unload_active();
}

fn tick(manager: &ShioriManager, last_minute: &mut Option<u32>, elapsed_secs: &mut u64, random_talk_secs: u64) {
    report("OnSecondChange", manager.on_second_change());

    let minute = chrono::Local::now().minute();
    if last_minute.is_some_and(|m| m != minute) {
        report("OnMinuteChange", manager.on_minute_change(minute));
    }
    *last_minute = Some(minute);

    *elapsed_secs += TICK_SECS;
    if random_talk_secs > 0 && *elapsed_secs % random_talk_secs == 0 {
        report("OnRandom", manager.dispatch("OnRandom", &[]));
    }
}

/// Log what the ghost said, if anything.
fn report(event: &str, result: Result<String, ShioriError>) {
    match result {
        Ok(raw) => match Response::parse(&raw) {
            Ok(response) => {
                if let Some(value) = response.value() {
                    tracing::info!(
                        event,
                        status = response.status,
                        surface = response.header("Surface").unwrap_or("0"),
                        "{}",
                        value
                    );
                } else {
                    tracing::debug!(event, status = response.status, "no talk");
                }
            }
            Err(e) => tracing::warn!(event, error = %e, "unreadable response"),
        },
        Err(ShioriError::EngineBusy) => tracing::warn!(event, "engine busy; event dropped"),
        Err(e) => tracing::warn!(event, error = %e, "event dispatch failed"),
    }
}
