//! Per-key chains of fixed windows.

use ahash::AHashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::warn;

use super::window::Window;
use crate::config::WindowConfig;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request is allowed to proceed.
    Allowed,
    /// Request exceeds a limit and should be rejected.
    Limited {
        /// Time until the denying window restarts
        retry_after: Duration,
    },
}

impl Decision {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Returns true if the request is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, Decision::Limited { .. })
    }

    /// Wait hint for the caller, zero when allowed.
    pub fn retry_after(&self) -> Duration {
        match self {
            Decision::Allowed => Duration::ZERO,
            Decision::Limited { retry_after } => *retry_after,
        }
    }
}

/// A limiter holding, for every key it has seen, an ordered chain of fixed
/// windows built from the same configuration.
///
/// A request is admitted only when every window of its key's chain admits it.
/// Windows are evaluated in configured order and evaluation stops at the first
/// denial; windows that already counted the request keep that count.
///
/// Keys are never evicted, so key cardinality should stay bounded (account IDs
/// rather than raw client addresses).
///
/// # Example
/// ```ignore
/// use std::time::{Duration, Instant};
///
/// let limiter = MultiBucketFixedWindowLimiter::new(vec![
///     WindowConfig::new(10, Duration::from_secs(1)),
///     WindowConfig::new(100, Duration::from_secs(60)),
/// ]);
/// if limiter.allow("account-42", Instant::now()).is_limited() {
///     // reply 429
/// }
/// ```
#[derive(Debug)]
pub struct MultiBucketFixedWindowLimiter {
    windows: Vec<WindowConfig>,
    keys: Mutex<AHashMap<String, Vec<Window>>>,
}

impl MultiBucketFixedWindowLimiter {
    pub fn new(windows: Vec<WindowConfig>) -> Self {
        Self { windows, keys: Mutex::new(AHashMap::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<String, Vec<Window>>> {
        self.keys.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn new_chain(&self, now: Instant) -> Vec<Window> {
        self.windows.iter().map(|cfg| Window::new(cfg, now)).collect()
    }

    /// Record a request for `key` and decide whether it may proceed.
    pub fn allow(&self, key: &str, now: Instant) -> Decision {
        let mut keys = self.lock();
        let chain = keys
            .entry(key.to_owned())
            .or_insert_with(|| self.new_chain(now));

        for window in chain.iter_mut() {
            let decision = window.allow(now);
            if decision.is_limited() {
                return decision;
            }
        }
        Decision::Allowed
    }

    /// Decide as [`allow`](Self::allow) would, without recording anything.
    pub fn would_allow(&self, key: &str, now: Instant) -> Decision {
        let keys = self.lock();
        let fresh;
        let chain = match keys.get(key) {
            Some(chain) => chain,
            None => {
                fresh = self.new_chain(now);
                &fresh
            }
        };

        chain
            .iter()
            .map(|window| window.would_allow(now))
            .find(Decision::is_limited)
            .unwrap_or(Decision::Allowed)
    }

    /// Replace limit and duration of `key`'s windows in place, keeping their
    /// counts and start times. Only keys already seen are affected; overrides
    /// beyond the number of configured windows are ignored.
    pub fn override_windows(&self, key: &str, overrides: &[WindowConfig]) {
        let mut keys = self.lock();
        if let Some(chain) = keys.get_mut(key) {
            for (window, cfg) in chain.iter_mut().zip(overrides) {
                window.apply(cfg);
            }
        }
    }

    /// Configured windows, in evaluation order.
    pub fn windows(&self) -> &[WindowConfig] {
        &self.windows
    }

    /// Number of distinct keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn counts(&self, key: &str) -> Option<Vec<(u64, u64, Instant)>> {
        self.lock()
            .get(key)
            .map(|chain| chain.iter().map(|w| (w.count, w.limit, w.start)).collect())
    }
}
