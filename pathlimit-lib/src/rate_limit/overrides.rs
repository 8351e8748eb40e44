use ahash::AHashMap;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::{OverrideConfig, RateLimitConfig, WindowConfig};

/// Source of per-key window overrides.
///
/// Only consulted for requests that the configured windows already denied, so
/// implementations may do I/O. Callers should bound that I/O with their own
/// timeout.
#[async_trait]
pub trait OverrideFetcher: Send + Sync {
    /// Replacement windows for `key` under `pattern`, if any.
    async fn fetch(&self, key: &str, pattern: &str) -> Option<Vec<WindowConfig>>;

    /// Called with every configuration the manager is offered.
    fn reconfigure(&self, _cfg: &RateLimitConfig) {}
}

/// Never overrides anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

#[async_trait]
impl OverrideFetcher for NoOverrides {
    async fn fetch(&self, _key: &str, _pattern: &str) -> Option<Vec<WindowConfig>> {
        None
    }
}

type OverrideMap = AHashMap<(String, String), Vec<WindowConfig>>;

/// Overrides taken from the `overrides` list of the configuration, refreshed
/// whenever the configuration is reloaded.
#[derive(Debug)]
pub struct StaticOverrides {
    entries: ArcSwap<OverrideMap>,
}

impl StaticOverrides {
    pub fn new(overrides: &[OverrideConfig]) -> Self {
        Self { entries: ArcSwap::from_pointee(Self::build(overrides)) }
    }

    fn build(overrides: &[OverrideConfig]) -> OverrideMap {
        overrides
            .iter()
            .map(|o| ((o.key.clone(), o.pattern.clone()), o.windows.clone()))
            .collect()
    }

    pub fn replace(&self, overrides: &[OverrideConfig]) {
        self.entries.store(Arc::new(Self::build(overrides)));
        debug!(count = overrides.len(), "Static rate limit overrides replaced");
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OverrideFetcher for StaticOverrides {
    async fn fetch(&self, key: &str, pattern: &str) -> Option<Vec<WindowConfig>> {
        self.entries
            .load()
            .get(&(key.to_string(), pattern.to_string()))
            .cloned()
    }

    fn reconfigure(&self, cfg: &RateLimitConfig) {
        self.replace(&cfg.overrides);
    }
}
