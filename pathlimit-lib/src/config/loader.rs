use std::fs;
use std::path::Path;

use crate::config::{LimitBy, RateLimitConfig};
use crate::error::{RateLimitError, Result};
use crate::pattern::Pattern;

/// Load and validate a configuration file.
///
/// `.yaml` / `.yml` files are read as YAML, everything else as TOML.
pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<RateLimitConfig> {
    let path = p.as_ref();
    let txt = fs::read_to_string(path)
        .map_err(|e| RateLimitError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(path, &txt)
}

/// Parse `txt` as the format implied by `path` and validate it.
pub fn parse_config(path: &Path, txt: &str) -> Result<RateLimitConfig> {
    let cfg = if is_yaml(path) { parse_yaml(txt)? } else { parse_toml(txt)? };

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn parse_toml(txt: &str) -> Result<RateLimitConfig> {
    toml::from_str(txt).map_err(|e| RateLimitError::Config(format!("Failed to parse config: {e}")))
}

pub fn parse_yaml(txt: &str) -> Result<RateLimitConfig> {
    serde_norway::from_str(txt)
        .map_err(|e| RateLimitError::Config(format!("Failed to parse config: {e}")))
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}

/// Checks that do not need the full rule table: pattern syntax, window sanity
/// and the key extraction settings. Pattern conflicts are detected when the
/// configuration is applied.
pub fn validate_config(cfg: &RateLimitConfig) -> Result<()> {
    if cfg.refresh_interval.is_zero() {
        return Err(RateLimitError::Config("refresh_interval must be > 0".into()));
    }

    if cfg.limit_by == LimitBy::Header && cfg.limit_by_header.is_none() {
        return Err(RateLimitError::Config(
            "limit_by_header is required when limit_by = \"header\"".into(),
        ));
    }

    for (text, windows) in &cfg.paths {
        Pattern::parse(text)
            .map_err(|source| RateLimitError::Pattern { pattern: text.clone(), source })?;

        if windows.is_empty() {
            return Err(RateLimitError::Config(format!("Pattern {text:?} has no windows")));
        }
        if windows.iter().any(|w| w.duration.is_zero()) {
            return Err(RateLimitError::Config(format!(
                "Pattern {text:?} has a window with zero duration"
            )));
        }
    }

    for o in &cfg.overrides {
        if !cfg.paths.contains_key(&o.pattern) {
            return Err(RateLimitError::Config(format!(
                "Override for key {:?} references unknown pattern {:?}",
                o.key, o.pattern
            )));
        }
        if o.windows.iter().any(|w| w.duration.is_zero()) {
            return Err(RateLimitError::Config(format!(
                "Override for key {:?} has a window with zero duration",
                o.key
            )));
        }
    }

    Ok(())
}
