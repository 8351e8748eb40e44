//! Pattern-scoped fixed-window admission control.
//!
//! A [`RateLimitManager`] owns a [`RuleTable`]: the configured patterns in
//! specificity order, each with its own [`MultiBucketFixedWindowLimiter`].
//! Requests are counted only against the most specific pattern they match.

mod limiter;
mod manager;
mod overrides;
mod refresh;
mod table;
mod window;

pub use limiter::{Decision, MultiBucketFixedWindowLimiter};
pub use manager::RateLimitManager;
pub use overrides::{NoOverrides, OverrideFetcher, StaticOverrides};
pub use refresh::{run_config_refresh, supervise_config_refresh, ConfigSource, FileConfigSource};
pub use table::{Rule, RuleTable};
