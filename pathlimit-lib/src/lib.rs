#![forbid(unsafe_code)]

pub mod admission;
pub mod config;
pub mod error;
pub mod pattern;
pub mod rate_limit;
pub mod telemetry;

pub use admission::{check_request, extract_rate_limit_key, too_many_requests};
pub use config::{load_from_path, LimitBy, Mode, RateLimitConfig, WindowConfig};
pub use error::{RateLimitError, Result};
pub use pattern::{Pattern, Relationship};
pub use rate_limit::{
    ConfigSource, Decision, FileConfigSource, NoOverrides, OverrideFetcher, RateLimitManager,
    StaticOverrides,
};
