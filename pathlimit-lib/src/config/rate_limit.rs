use ahash::RandomState;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::telemetry::{LoggingConfig, TelemetryConfig};

/// What happens to a request that exceeds its limits
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Breaches are recorded but the request proceeds
    #[default]
    Reporting,
    /// Breaches are rejected with a retry-after hint
    Enforcing,
}

/// One fixed window: at most `limit` requests per `duration`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowConfig {
    /// Maximum number of requests admitted in one window
    pub limit: u64,
    /// Window length as a human readable duration
    /// Examples: "500ms", "1s", "1m", "1h 30m"
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration: Duration,
}

impl WindowConfig {
    pub fn new(limit: u64, duration: Duration) -> Self {
        Self { limit, duration }
    }
}

/// Rate limiting key extraction strategy
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LimitBy {
    /// Rate limit by client IP address
    /// Extracts IP from X-Forwarded-For or connection IP
    #[default]
    Ip,
    /// Rate limit by custom header value
    /// Requires limit_by_header to be specified
    Header,
}

/// A statically configured override of one key's windows for one pattern
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OverrideConfig {
    /// Rate limiting key the override applies to
    pub key: String,
    /// Pattern text exactly as written under `paths`
    pub pattern: String,
    /// Replacement windows, applied in order over the configured ones
    pub windows: Vec<WindowConfig>,
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    /// When false every request is allowed
    /// Default: false
    #[serde(default)]
    pub enabled: bool,
    /// "reporting" or "enforcing"
    /// Default: "reporting"
    #[serde(default)]
    pub mode: Mode,
    /// Application name attached to every metric
    /// Default: "pathlimit"
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// How often the configuration source is polled for changes
    /// Default: "5s"
    #[serde(default = "default_refresh_interval", deserialize_with = "deserialize_duration")]
    pub refresh_interval: Duration,
    /// Pattern → windows. A request must pass every window of the most specific
    /// matching pattern.
    /// Example: "GET /accounts/{id}" = [{ limit = 10, duration = "1s" }]
    #[serde(default)]
    pub paths: BTreeMap<String, Vec<WindowConfig>>,
    /// Key extraction strategy
    /// Default: "ip"
    #[serde(default)]
    pub limit_by: LimitBy,
    /// Custom header name for "header" limit_by mode
    /// Required when limit_by = "header"
    #[serde(default)]
    pub limit_by_header: Option<String>,
    /// Per-key overrides served by the static override source
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: Mode::default(),
            app_name: default_app_name(),
            refresh_interval: default_refresh_interval(),
            paths: BTreeMap::new(),
            limit_by: LimitBy::default(),
            limit_by_header: None,
            overrides: Vec::new(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

// Fixed seeds keep the hash stable across runs of the process.
const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

impl RateLimitConfig {
    /// Hash of the parts that shape the limiter table: `app_name`, `enabled`,
    /// `mode` and `paths`. `paths` is a sorted map, so the hash does not depend on the
    /// order entries were written in.
    pub fn content_hash(&self) -> u64 {
        let state = RandomState::with_seeds(HASH_SEEDS[0], HASH_SEEDS[1], HASH_SEEDS[2], HASH_SEEDS[3]);
        state.hash_one((&self.app_name, self.enabled, self.mode, &self.paths))
    }
}

fn default_app_name() -> String {
    "pathlimit".to_string()
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(5)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s)
        .map_err(|e| serde::de::Error::custom(format!("Invalid duration '{}': {}", s, e)))
}
