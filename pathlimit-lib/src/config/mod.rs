mod loader;
mod rate_limit;
mod telemetry;

pub use loader::{load_from_path, parse_config, parse_toml, parse_yaml, validate_config};
pub use rate_limit::{LimitBy, Mode, OverrideConfig, RateLimitConfig, WindowConfig};
pub use telemetry::{LoggingConfig, TelemetryConfig};
