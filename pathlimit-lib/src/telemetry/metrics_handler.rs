use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use prometheus::{Encoder, TextEncoder};

use crate::error::{RateLimitError, Result};

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Render every metric family in `registry` in the Prometheus text format.
pub fn handle_metrics(registry: &prometheus::Registry) -> Result<Response<RespBody>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| RateLimitError::Http(format!("Failed to encode metrics: {e}")))?;

    let body = Full::new(Bytes::from(buffer)).map_err(|never| match never {}).boxed();

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(body)
        .map_err(|e| RateLimitError::Http(format!("Failed to build metrics response: {e}")))
}
