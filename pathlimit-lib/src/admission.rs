//! HTTP glue: derive the limiting key from a request and turn a
//! [`Decision`] into a `429 Too Many Requests` response.

use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::Response;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::LimitBy;
use crate::rate_limit::{Decision, RateLimitManager};

pub type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

/// Key a request is counted under.
///
/// `Ip` takes the first `X-Forwarded-For` entry, then the peer address.
/// `Header` takes the named header and falls back to the peer address.
pub fn extract_rate_limit_key(
    limit_by: LimitBy,
    peer: SocketAddr,
    header_name: Option<&str>,
    headers: &HeaderMap,
) -> String {
    let from_header = match limit_by {
        LimitBy::Ip => headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty()),
        LimitBy::Header => header_name
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty()),
    };

    from_header.map_or_else(|| peer.ip().to_string(), str::to_string)
}

/// Run admission for one request.
///
/// Returns `None` if the request may proceed, `Some(429)` otherwise.
pub async fn check_request(
    manager: &RateLimitManager,
    method: &str,
    path: &str,
    key: &str,
) -> Option<Response<RespBody>> {
    match manager.allow(method, path, key).await {
        Decision::Allowed => None,
        Decision::Limited { retry_after } => Some(too_many_requests(retry_after)),
    }
}

/// `429` carrying `Retry-After` and `x-ratelimit-reset`, both in whole
/// seconds rounded up.
pub fn too_many_requests(retry_after: Duration) -> Response<RespBody> {
    let body = Full::new(bytes::Bytes::from("Too Many Requests"))
        .map_err(|never| match never {})
        .boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let value = HeaderValue::from(secs);
    resp.headers_mut().insert(http::header::RETRY_AFTER, value.clone());
    resp.headers_mut().insert("x-ratelimit-reset", value);

    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, RateLimitConfig, WindowConfig};
    use crate::rate_limit::NoOverrides;
    use std::sync::Arc;

    type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 7], 4242))
    }

    #[test]
    fn ip_key_prefers_forwarded_for() -> TestResult {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_rate_limit_key(LimitBy::Ip, peer(), None, &headers), "10.0.0.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 1.2.3.4 , 5.6.7.8"));
        assert_eq!(extract_rate_limit_key(LimitBy::Ip, peer(), None, &headers), "1.2.3.4");
        Ok(())
    }

    #[test]
    fn header_key_falls_back_to_peer() -> TestResult {
        let mut headers = HeaderMap::new();
        assert_eq!(
            extract_rate_limit_key(LimitBy::Header, peer(), Some("x-api-key"), &headers),
            "10.0.0.7"
        );

        headers.insert("x-api-key", HeaderValue::from_static("tenant-a"));
        assert_eq!(
            extract_rate_limit_key(LimitBy::Header, peer(), Some("x-api-key"), &headers),
            "tenant-a"
        );
        Ok(())
    }

    #[test]
    fn retry_after_is_rounded_up() -> TestResult {
        let resp = too_many_requests(Duration::from_millis(1500));
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(http::header::RETRY_AFTER), Some(&HeaderValue::from(2u64)));
        assert_eq!(resp.headers().get("x-ratelimit-reset"), Some(&HeaderValue::from(2u64)));

        let resp = too_many_requests(Duration::from_secs(3));
        assert_eq!(resp.headers().get(http::header::RETRY_AFTER), Some(&HeaderValue::from(3u64)));
        Ok(())
    }

    #[tokio::test]
    async fn check_request_rejects_over_limit() -> TestResult {
        let mut cfg = RateLimitConfig { enabled: true, mode: Mode::Enforcing, ..Default::default() };
        cfg.paths.insert("POST /login".into(), vec![WindowConfig::new(1, Duration::from_secs(60))]);
        let manager = RateLimitManager::new(&cfg, Arc::new(NoOverrides), None)?;

        assert!(check_request(&manager, "POST", "/login", "k").await.is_none());
        let resp = check_request(&manager, "POST", "/login", "k").await;
        assert_eq!(resp.map(|r| r.status()), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(check_request(&manager, "GET", "/login", "k").await.is_none());
        Ok(())
    }
}
