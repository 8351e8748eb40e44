use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::rate_limit::RateLimitManager;
use crate::telemetry::{handle_metrics, health_check_response};

type RespBody = BoxBody<Bytes, hyper::Error>;

fn plain(status: StatusCode, text: &'static str) -> Response<RespBody> {
    let body = Full::new(Bytes::from(text)).map_err(|never| match never {}).boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp
}

fn route(path: &str, registry: &Registry, manager: &RateLimitManager) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(manager),
        "/metrics" => handle_metrics(registry),
        _ => return plain(StatusCode::NOT_FOUND, "Not Found"),
    };
    result.unwrap_or_else(|e| {
        warn!(error = %e, path, "Observability server: handler error");
        plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

/// Serve `/metrics` (Prometheus) and `/health` (active rate limit table)
/// on a dedicated port until `cancel` fires.
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    manager: Arc<RateLimitManager>,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Observability server: shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let manager = manager.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let resp = route(req.uri().path(), &registry, &manager);
                        async move { Ok::<_, hyper::Error>(resp) }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::rate_limit::NoOverrides;

    #[test]
    fn unknown_paths_are_not_found() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let manager = RateLimitManager::new(&RateLimitConfig::default(), Arc::new(NoOverrides), None)?;
        let registry = Registry::new();
        assert_eq!(route("/nope", &registry, &manager).status(), StatusCode::NOT_FOUND);
        assert_eq!(route("/health", &registry, &manager).status(), StatusCode::OK);
        assert_eq!(route("/metrics", &registry, &manager).status(), StatusCode::OK);
        Ok(())
    }
}
