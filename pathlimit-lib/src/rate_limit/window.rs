use std::time::{Duration, Instant};

use super::Decision;
use crate::config::WindowConfig;

/// A single fixed-window counter.
///
/// The window restarts lazily: the first call at or after `start + duration`
/// resets the count and moves `start` to that call's instant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub(crate) limit: u64,
    pub(crate) duration: Duration,
    pub(crate) count: u64,
    pub(crate) start: Instant,
}

impl Window {
    pub(crate) fn new(cfg: &WindowConfig, now: Instant) -> Self {
        Self { limit: cfg.limit, duration: cfg.duration, count: 0, start: now }
    }

    fn roll(&mut self, now: Instant) {
        if now.saturating_duration_since(self.start) >= self.duration {
            self.start = now;
            self.count = 0;
        }
    }

    /// Count one request if the window has room for it.
    pub(crate) fn allow(&mut self, now: Instant) -> Decision {
        self.roll(now);
        if self.count < self.limit {
            self.count += 1;
            Decision::Allowed
        } else {
            let retry_after = self
                .start
                .checked_add(self.duration)
                .map_or(self.duration, |end| end.saturating_duration_since(now));
            Decision::Limited { retry_after }
        }
    }

    /// Same policy as [`Window::allow`] without touching the counter.
    pub(crate) fn would_allow(&self, now: Instant) -> Decision {
        let mut probe = *self;
        probe.allow(now)
    }

    pub(crate) fn apply(&mut self, cfg: &WindowConfig) {
        self.limit = cfg.limit;
        self.duration = cfg.duration;
    }
}
