use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pathlimit_lib::config::{load_from_path, LimitBy, Mode};
use pathlimit_lib::RateLimitError;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn write(dir: &TempDir, name: &str, body: &str) -> Result<PathBuf, std::io::Error> {
    let path = dir.path().join(name);
    fs::write(&path, body)?;
    Ok(path)
}

#[test]
fn loads_minimal_config_with_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(&dir, "minimal.toml", "")?;

    let cfg = load_from_path(&path)?;
    assert!(!cfg.enabled);
    assert_eq!(cfg.mode, Mode::Reporting);
    assert_eq!(cfg.app_name, "pathlimit");
    assert_eq!(cfg.refresh_interval, Duration::from_secs(5));
    assert!(cfg.paths.is_empty());
    assert_eq!(cfg.limit_by, LimitBy::Ip);
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.telemetry.metrics_port, None);
    Ok(())
}

#[test]
fn loads_toml_paths_and_overrides() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(
        &dir,
        "full.toml",
        r#"
enabled = true
mode = "enforcing"
app_name = "accounts"
refresh_interval = "30s"
limit_by = "header"
limit_by_header = "x-api-key"

[paths]
"GET /accounts/{id}" = [
  { limit = 10, duration = "1s" },
  { limit = 100, duration = "1m" },
]
"/accounts/{rest...}" = [{ limit = 50, duration = "1s" }]

[[overrides]]
key = "tenant-a"
pattern = "GET /accounts/{id}"
windows = [{ limit = 20, duration = "1s" }]

[telemetry]
metrics_port = 9090
"#,
    )?;

    let cfg = load_from_path(&path)?;
    assert!(cfg.enabled);
    assert_eq!(cfg.mode, Mode::Enforcing);
    assert_eq!(cfg.app_name, "accounts");
    assert_eq!(cfg.refresh_interval, Duration::from_secs(30));
    assert_eq!(cfg.limit_by, LimitBy::Header);
    assert_eq!(cfg.limit_by_header.as_deref(), Some("x-api-key"));

    let windows = cfg.paths.get("GET /accounts/{id}").ok_or("pattern missing")?;
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[1].limit, 100);
    assert_eq!(windows[1].duration, Duration::from_secs(60));

    assert_eq!(cfg.overrides.len(), 1);
    assert_eq!(cfg.overrides[0].key, "tenant-a");
    assert_eq!(cfg.telemetry.metrics_port, Some(9090));
    Ok(())
}

#[test]
fn loads_yaml_by_extension() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(
        &dir,
        "limits.yaml",
        r#"
enabled: true
mode: enforcing
paths:
  "POST /login":
    - limit: 5
      duration: 1m
"#,
    )?;

    let cfg = load_from_path(&path)?;
    assert!(cfg.enabled);
    let windows = cfg.paths.get("POST /login").ok_or("pattern missing")?;
    assert_eq!(windows[0].limit, 5);
    assert_eq!(windows[0].duration, Duration::from_secs(60));
    Ok(())
}

#[test]
fn rejects_malformed_pattern() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(
        &dir,
        "bad.toml",
        r#"
[paths]
"/foo/{all...}/bar" = [{ limit = 1, duration = "1s" }]
"#,
    )?;

    match load_from_path(&path) {
        Err(RateLimitError::Pattern { pattern, .. }) => assert_eq!(pattern, "/foo/{all...}/bar"),
        other => return Err(format!("expected pattern error, got {other:?}").into()),
    }
    Ok(())
}

#[test]
fn rejects_header_mode_without_header_name() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(&dir, "header.toml", "limit_by = \"header\"\n")?;
    assert!(matches!(load_from_path(&path), Err(RateLimitError::Config(_))));
    Ok(())
}

#[test]
fn rejects_override_for_unknown_pattern() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(
        &dir,
        "override.toml",
        r#"
[paths]
"/foo" = [{ limit = 1, duration = "1s" }]

[[overrides]]
key = "k"
pattern = "/bar"
windows = [{ limit = 2, duration = "1s" }]
"#,
    )?;
    assert!(matches!(load_from_path(&path), Err(RateLimitError::Config(_))));
    Ok(())
}

#[test]
fn rejects_zero_duration_window() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write(
        &dir,
        "zero.toml",
        r#"
[paths]
"/foo" = [{ limit = 1, duration = "0s" }]
"#,
    )?;
    assert!(matches!(load_from_path(&path), Err(RateLimitError::Config(_))));
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.toml");
    assert!(matches!(load_from_path(&path), Err(RateLimitError::Config(_))));
    Ok(())
}
