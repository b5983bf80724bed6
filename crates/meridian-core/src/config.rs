use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUS_URL: &str = "nats://127.0.0.1:4222";
pub const DEFAULT_BUS_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const BUS_RECONNECT_MIN_MS: u64 = 100;
pub const BUS_RECONNECT_MAX_MS: u64 = 10_000;
pub const BINARY_PASS_BY_PATH_THRESHOLD_BYTES: usize = 256 * 1024;

/// Top-level config (meridian.toml + `MERIDIAN_*` env overrides), loaded the
/// same way the teacher layers `SkynetConfig`: file first, then env.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeridianConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_url")]
    pub url: String,
    #[serde(default = "default_bus_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            request_timeout_ms: default_bus_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_context_db_path")]
    pub context_path: String,
    #[serde(default = "default_timeline_db_path")]
    pub timeline_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            context_path: default_context_db_path(),
            timeline_path: default_timeline_db_path(),
        }
    }
}

/// Context Store TTL knobs (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_context_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_context_ttl_hours(),
        }
    }
}

/// Timeline Store retention knobs (spec §3 retention policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_command_retention_days")]
    pub command_retention_days: i64,
    #[serde(default = "default_file_retention_days")]
    pub file_retention_days: i64,
    #[serde(default = "default_focus_retention_days")]
    pub focus_retention_days: i64,
    #[serde(default = "default_snapshot_retention_hours")]
    pub snapshot_retention_hours: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            command_retention_days: default_command_retention_days(),
            file_retention_days: default_file_retention_days(),
            focus_retention_days: default_focus_retention_days(),
            snapshot_retention_hours: default_snapshot_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Event Collector cadence knobs (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
    #[serde(default = "default_fs_debounce_ms")]
    pub fs_debounce_ms: u64,
    #[serde(default)]
    pub watch_paths: Vec<String>,
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: default_snapshot_interval_secs(),
            fs_debounce_ms: default_fs_debounce_ms(),
            watch_paths: Vec::new(),
        }
    }
}

/// Conversation Engine timing knobs (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            execution_timeout_secs: default_execution_timeout_secs(),
        }
    }
}

/// Minimal ops-only HTTP surface knobs (spec §6 expansion: `/healthz`, `/readyz`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind")]
    pub bind: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
            port: default_http_port(),
        }
    }
}

fn default_http_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8700
}

fn default_bus_url() -> String {
    DEFAULT_BUS_URL.to_string()
}
fn default_bus_timeout_ms() -> u64 {
    DEFAULT_BUS_REQUEST_TIMEOUT_MS
}
fn default_context_ttl_hours() -> i64 {
    24
}
fn default_command_retention_days() -> i64 {
    30
}
fn default_file_retention_days() -> i64 {
    7
}
fn default_focus_retention_days() -> i64 {
    7
}
fn default_snapshot_retention_hours() -> i64 {
    24
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_snapshot_interval_secs() -> u64 {
    300
}
fn default_fs_debounce_ms() -> u64 {
    500
}
fn default_execution_timeout_secs() -> u64 {
    120
}

fn default_data_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.meridian")
}
fn default_context_db_path() -> String {
    format!("{}/context.db", default_data_dir())
}
fn default_timeline_db_path() -> String {
    format!("{}/timeline.db", default_data_dir())
}

impl MeridianConfig {
    /// Load config from a TOML file with `MERIDIAN_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, then `~/.meridian/meridian.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: MeridianConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MERIDIAN_").split("_"))
            .extract()
            .map_err(|e| crate::error::MeridianError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/meridian.toml", default_data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = MeridianConfig::default();
        assert_eq!(cfg.context.ttl_hours, 24);
        assert_eq!(cfg.timeline.command_retention_days, 30);
        assert_eq!(cfg.timeline.file_retention_days, 7);
        assert_eq!(cfg.timeline.focus_retention_days, 7);
        assert_eq!(cfg.timeline.snapshot_retention_hours, 24);
        assert_eq!(cfg.collectors.snapshot_interval_secs, 300);
        assert_eq!(cfg.collectors.fs_debounce_ms, 500);
        assert_eq!(cfg.conversation.execution_timeout_secs, 120);
    }

    #[test]
    fn load_falls_back_to_defaults_when_file_missing() {
        let cfg = MeridianConfig::load(Some("/nonexistent/path/meridian.toml")).unwrap();
        assert_eq!(cfg.bus.url, DEFAULT_BUS_URL);
    }
}
