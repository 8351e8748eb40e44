use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::config::Mode;
use crate::error::{RateLimitError, Result};
use crate::rate_limit::RateLimitManager;

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Health check with a summary of the active rate limit table.
/// Always 200 while the process is running.
pub fn health_check_response(manager: &RateLimitManager) -> Result<Response<RespBody>> {
    let table = manager.table();
    let mode = match table.mode() {
        Mode::Reporting => "reporting",
        Mode::Enforcing => "enforcing",
    };
    let body = json!({
        "status": "healthy",
        "enabled": table.is_enabled(),
        "mode": mode,
        "patterns": table.patterns().collect::<Vec<_>>(),
    });
    let body_bytes = serde_json::to_vec(&body)
        .map_err(|e| RateLimitError::Http(format!("Failed to serialize health response: {e}")))?;

    let body = Full::new(Bytes::from(body_bytes)).map_err(|never| match never {}).boxed();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| RateLimitError::Http(format!("Failed to build health response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, WindowConfig};
    use crate::rate_limit::NoOverrides;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn health_reports_active_patterns() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut cfg = RateLimitConfig { enabled: true, mode: Mode::Enforcing, ..Default::default() };
        cfg.paths.insert("/foo".into(), vec![WindowConfig::new(1, Duration::from_secs(1))]);
        let manager = RateLimitManager::new(&cfg, Arc::new(NoOverrides), None)?;

        let resp = health_check_response(&manager)?;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = resp.into_body().collect().await?.to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["enabled"], true);
        assert_eq!(value["mode"], "enforcing");
        assert_eq!(value["patterns"], json!(["/foo"]));
        Ok(())
    }
}
