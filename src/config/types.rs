use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::platform::PlatformConfig;

/// Root configuration for coreguard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// User-level connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Reload retry and verification policy
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Periodic status monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Persistent state backend
    #[serde(default)]
    pub state: StateConfig,

    /// Admin API configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Logging and tracing
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Connection settings that are not discovered from the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// TCP connect timeout
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Platform values used when the environment does not provide them
    #[serde(default)]
    pub platform: Option<PlatformConfig>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            platform: None,
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(3)
}

/// Reload retry and verification policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadConfig {
    /// Maximum RELOAD attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between failed attempts
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// STATUS polls per verification
    #[serde(default = "default_verify_attempts")]
    pub verify_attempts: u32,

    /// Pause between STATUS polls
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
            verify_attempts: default_verify_attempts(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_verify_attempts() -> u32 {
    5
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// Backoff strategy selection
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    None,
    Fixed,
    #[default]
    Linear,
    Exponential,
}

/// Backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default)]
    pub kind: BackoffKind,

    /// Base delay (multiplied by the attempt number for linear backoff)
    #[serde(default = "default_backoff_base", with = "humantime_serde")]
    pub base: Duration,

    /// Upper bound for exponential backoff
    #[serde(default = "default_backoff_max", with = "humantime_serde")]
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            kind: BackoffKind::default(),
            base: default_backoff_base(),
            max: default_backoff_max(),
        }
    }
}

fn default_backoff_base() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(60)
}

/// Periodic status monitor
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Run the scheduler in `serve` mode
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum time between two unforced status checks
    #[serde(default = "default_check_interval", with = "humantime_serde")]
    pub check_interval: Duration,

    /// How often the scheduler wakes up to offer a check
    #[serde(default = "default_tick", with = "humantime_serde")]
    pub tick: Duration,

    /// Schema version the operator expects to be active.
    /// Written to the state store at startup when set.
    #[serde(default)]
    pub expected_schema_version: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: default_check_interval(),
            tick: default_tick(),
            expected_schema_version: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_tick() -> Duration {
    Duration::from_secs(60)
}

/// State store backend
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    Memory,
    #[default]
    Persistent,
}

/// State store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    /// Data directory for the persistent backend, the platform data dir if unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Admin API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Serve the admin API in `serve` mode
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address
    #[serde(default = "default_admin_address")]
    pub address: SocketAddr,

    /// User-facing messages kept until drained
    #[serde(default = "default_message_capacity")]
    pub message_capacity: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_admin_address(),
            message_capacity: default_message_capacity(),
        }
    }
}

fn default_admin_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9180))
}

fn default_message_capacity() -> usize {
    256
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON log format
    #[serde(default)]
    pub json_logs: bool,

    /// OTLP endpoint for trace export
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Trace sample rate (0.0 - 1.0)
    #[serde(default = "default_sample_rate")]
    pub trace_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            otlp_endpoint: None,
            trace_sample_rate: default_sample_rate(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> f64 {
    1.0
}
