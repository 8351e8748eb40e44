mod health;
mod metrics_handler;
pub mod metrics;
pub mod server;
pub mod tracing;

pub use health::health_check_response;
pub use metrics::{init_metrics, Metrics};
pub use metrics_handler::handle_metrics;
pub use server::start_observability_server;
pub use tracing::init_tracing;
