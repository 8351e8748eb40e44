use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::table::RuleTable;
use super::{Decision, OverrideFetcher};
use crate::config::{Mode, RateLimitConfig};
use crate::error::Result;
use crate::pattern::split_path;
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Admission control for every request of one application.
///
/// Holds the active [`RuleTable`] behind an atomic pointer: a request works on
/// the table it loaded for its whole decision, and a reload swaps in a complete
/// new table, so no request ever sees a mix of two configurations.
pub struct RateLimitManager {
    table: ArcSwap<RuleTable>,
    overrides: Arc<dyn OverrideFetcher>,
    metrics: Option<Arc<Metrics>>,
}

impl RateLimitManager {
    /// Create a manager from an initial configuration.
    pub fn new(
        cfg: &RateLimitConfig,
        overrides: Arc<dyn OverrideFetcher>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let table = RuleTable::compile(cfg)?;
        overrides.reconfigure(cfg);
        if let Some(m) = &metrics {
            m.record_rules_loaded(&table.app_name, table.rules().len());
        }
        info!(
            app = %table.app_name,
            enabled = table.enabled,
            mode = ?table.mode,
            patterns = table.rules().len(),
            "Rate limit configuration loaded"
        );
        Ok(Self { table: ArcSwap::from_pointee(table), overrides, metrics })
    }

    /// Apply `cfg` unless it hashes the same as the active configuration.
    ///
    /// Returns whether a new table was installed. On error neither the active
    /// table nor the overrides change.
    pub fn apply_config(&self, cfg: &RateLimitConfig) -> Result<bool> {
        let current = self.table.load();
        if cfg.content_hash() == current.config_hash {
            self.overrides.reconfigure(cfg);
            if let Some(m) = &self.metrics {
                m.record_config_reload(&current.app_name, values::RELOAD_UNCHANGED);
            }
            return Ok(false);
        }

        let table = match RuleTable::compile(cfg) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Rejected rate limit configuration, keeping the previous one");
                if let Some(m) = &self.metrics {
                    m.record_config_reload(&current.app_name, values::RELOAD_REJECTED);
                }
                return Err(e);
            }
        };

        info!(
            app = %table.app_name,
            enabled = table.enabled,
            mode = ?table.mode,
            patterns = table.rules().len(),
            "Rate limit configuration reloaded"
        );
        if let Some(m) = &self.metrics {
            m.record_config_reload(&table.app_name, values::RELOAD_APPLIED);
            m.record_rules_loaded(&table.app_name, table.rules().len());
        }
        self.overrides.reconfigure(cfg);
        self.table.store(Arc::new(table));
        Ok(true)
    }

    pub(crate) fn record_fetch_failure(&self) {
        if let Some(m) = &self.metrics {
            m.record_config_reload(&self.table.load().app_name, values::RELOAD_FETCH_FAILED);
        }
    }

    /// Decide whether a request may proceed.
    pub async fn allow(&self, method: &str, path: &str, key: &str) -> Decision {
        self.allow_at(method, path, key, Instant::now()).await
    }

    /// [`allow`](Self::allow) at an explicit instant.
    pub async fn allow_at(&self, method: &str, path: &str, key: &str, now: Instant) -> Decision {
        let table = self.table.load_full();
        if !table.enabled {
            return Decision::Allowed;
        }

        let segments = split_path(path);
        let Some(rule) = table.find(method, &segments) else {
            return Decision::Allowed;
        };
        let pattern = rule.pattern().as_str();
        let app = table.app_name.as_str();

        if let Some(m) = &self.metrics {
            m.record_rate_limit_request(app, pattern, key);
        }

        let mut decision = rule.limiter().allow(key, now);
        if decision.is_allowed() {
            return decision;
        }

        if let Some(windows) = self.overrides.fetch(key, pattern).await {
            rule.limiter().override_windows(key, &windows);
            decision = rule.limiter().would_allow(key, now);
            if decision.is_allowed() {
                debug!(app, pattern, key, "Request admitted by override");
                if let Some(m) = &self.metrics {
                    m.record_rate_limit_override_allowed(app, pattern, key);
                }
                return decision;
            }
        }

        match table.mode {
            Mode::Reporting => {
                debug!(app, pattern, key, "Request over limit (reporting only)");
                if let Some(m) = &self.metrics {
                    m.record_rate_limit_would_reject(app, pattern, key);
                }
                Decision::Allowed
            }
            Mode::Enforcing => {
                debug!(
                    app,
                    pattern,
                    key,
                    retry_after = ?decision.retry_after(),
                    "Request rejected by rate limit"
                );
                if let Some(m) = &self.metrics {
                    m.record_rate_limit_rejection(app, pattern, key);
                }
                decision
            }
        }
    }

    /// Snapshot of the active table.
    pub fn table(&self) -> Arc<RuleTable> {
        self.table.load_full()
    }

    pub fn is_enabled(&self) -> bool {
        self.table.load().enabled
    }

    pub fn mode(&self) -> Mode {
        self.table.load().mode
    }

    pub fn config_hash(&self) -> u64 {
        self.table.load().config_hash
    }

    /// Active patterns, most specific first.
    pub fn patterns(&self) -> Vec<String> {
        self.table.load().patterns().map(str::to_string).collect()
    }
}
