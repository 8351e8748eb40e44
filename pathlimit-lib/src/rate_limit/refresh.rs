use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::RateLimitManager;
use crate::config::{parse_config, RateLimitConfig};
use crate::error::{RateLimitError, Result};

/// Where the manager's configuration comes from. Polled by
/// [`run_config_refresh`].
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<RateLimitConfig>;
}

/// Reads the configuration from a TOML or YAML file on every poll.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<RateLimitConfig> {
        let txt = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RateLimitError::Source(format!(
                "Unable to read config file [{}]: {e}",
                self.path.display()
            ))
        })?;

        parse_config(&self.path, &txt)
    }
}

/// Poll `source` every `interval` and apply configurations whose hash changed.
///
/// Returns `Ok(())` once `cancel` fires. A fetch or apply error is logged and
/// returned; the loop does not retry on its own (see
/// [`supervise_config_refresh`]).
pub async fn run_config_refresh(
    manager: Arc<RateLimitManager>,
    source: Arc<dyn ConfigSource>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the manager already runs on a
    // freshly loaded configuration.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Config refresh cancelled");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let cfg = match source.fetch().await {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = %e, "Failed to fetch rate limit configuration");
                manager.record_fetch_failure();
                return Err(e);
            }
        };

        match manager.apply_config(&cfg) {
            Ok(true) => debug!(hash = manager.config_hash(), "New rate limit configuration applied"),
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Failed to apply rate limit configuration");
                return Err(e);
            }
        }
    }
}

/// Keep [`run_config_refresh`] alive, restarting it `restart_delay` after each
/// failure until `cancel` fires.
pub async fn supervise_config_refresh(
    manager: Arc<RateLimitManager>,
    source: Arc<dyn ConfigSource>,
    interval: Duration,
    restart_delay: Duration,
    cancel: CancellationToken,
) {
    info!(?interval, "Config refresh started");
    loop {
        let result =
            run_config_refresh(manager.clone(), source.clone(), interval, cancel.clone()).await;
        match result {
            Ok(()) => break,
            Err(e) => {
                warn!(error = %e, ?restart_delay, "Config refresh stopped, restarting");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(restart_delay) => {}
                }
            }
        }
    }
    info!("Config refresh stopped");
}
