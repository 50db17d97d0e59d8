//! Application-level configuration loading, including engine timings and storage selection.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBUG_BACK_CONFIG_PATH";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Timings and limits used by every controller session.
    pub engine: EngineConfig,
    /// Which storage backend the supervisor should connect to.
    pub store: StoreKind,
    /// Optional endpoints receiving final results.
    pub records: RecordsConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        store = ?app_config.store,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

/// Timings and limits of the live game engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window during which successive state changes are coalesced into one write.
    pub debounce_ms: u64,
    /// Interval, in clock seconds, between time-field heartbeats while the game clock runs.
    pub heartbeat_secs: u32,
    /// How long remote time fields are ignored after a local game clock stop.
    pub quarantine_ms: u64,
    /// How long a score celebration stays visible before it expires or commits.
    pub celebration_delay_ms: u64,
    /// Length of a regulation quarter.
    pub quarter_seconds: u32,
    /// Length of an overtime period.
    pub overtime_seconds: u32,
    /// Full play clock value.
    pub play_clock_seconds: u32,
    /// Play clock value used after administrative stoppages.
    pub play_clock_reset_seconds: u32,
    /// Length of the timeout clock.
    pub timeout_seconds: u32,
    /// Timeouts granted to each team per half.
    pub regulation_timeouts: u8,
    /// Timeouts granted to each team per overtime period.
    pub overtime_timeouts: u8,
    /// Upper bound on the elapsed time accepted when resuming a running clock.
    pub max_resume_elapsed_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            heartbeat_secs: 5,
            quarantine_ms: 2_000,
            celebration_delay_ms: 4_000,
            quarter_seconds: 900,
            overtime_seconds: 600,
            play_clock_seconds: 40,
            play_clock_reset_seconds: 25,
            timeout_seconds: 60,
            regulation_timeouts: 3,
            overtime_timeouts: 2,
            max_resume_elapsed_secs: 86_400,
        }
    }
}

impl EngineConfig {
    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Quarantine window as a [`Duration`].
    pub fn quarantine(&self) -> Duration {
        Duration::from_millis(self.quarantine_ms)
    }

    /// Celebration delay as a [`Duration`].
    pub fn celebration_delay(&self) -> Duration {
        Duration::from_millis(self.celebration_delay_ms)
    }
}

/// Storage backend selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process-local store, lost on restart.
    #[default]
    Memory,
    /// CouchDB store configured through `COUCH_*` environment variables.
    Couchdb,
}

/// Endpoints notified when a game is finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Endpoint receiving win/loss records.
    pub team_records_url: Option<String>,
    /// Endpoint receiving bracket results.
    pub bracket_results_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    engine: EngineConfig,
    store: StoreKind,
    records: RecordsConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            engine: value.engine,
            store: value.store,
            records: value.records,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_engine_section_keeps_other_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "engine": { "debounce_ms": 250 }, "store": "couchdb" }"#)
                .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.engine.debounce_ms, 250);
        assert_eq!(config.engine.heartbeat_secs, 5);
        assert_eq!(config.store, StoreKind::Couchdb);
        assert!(config.records.team_records_url.is_none());
    }

    #[test]
    fn empty_document_yields_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.store, StoreKind::Memory);
    }
}
