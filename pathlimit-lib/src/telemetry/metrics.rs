use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const APP: &str = "app";
    pub const PATTERN: &str = "pattern";
    pub const KEY: &str = "key";
    pub const RESULT: &str = "result";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const RELOAD_APPLIED: &str = "applied";
    pub const RELOAD_UNCHANGED: &str = "unchanged";
    pub const RELOAD_REJECTED: &str = "rejected";
    pub const RELOAD_FETCH_FAILED: &str = "fetch_failed";
}

#[derive(Clone)]
pub struct Metrics {
    // Request decisions, labelled by app, pattern and key
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,
    pub rate_limit_would_reject_total: Counter<u64>,
    pub rate_limit_override_allowed_total: Counter<u64>,

    // Configuration
    pub config_reloads_total: Counter<u64>,
    pub rules_loaded: Gauge<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            rate_limit_requests_total: meter
                .u64_counter("pathlimit_rate_limit_requests_total")
                .with_description("Total number of requests that matched a rate limit pattern")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("pathlimit_rate_limit_rejected_total")
                .with_description("Total number of requests rejected by the rate limiter (429)")
                .build(),
            rate_limit_would_reject_total: meter
                .u64_counter("pathlimit_rate_limit_would_reject_total")
                .with_description(
                    "Total number of requests over their limit that were allowed in reporting mode",
                )
                .build(),
            rate_limit_override_allowed_total: meter
                .u64_counter("pathlimit_rate_limit_override_allowed_total")
                .with_description("Total number of requests admitted only because of an override")
                .build(),

            config_reloads_total: meter
                .u64_counter("pathlimit_config_reloads_total")
                .with_description(
                    "Total number of configuration refreshes. result=applied|unchanged|rejected|fetch_failed",
                )
                .build(),
            rules_loaded: meter
                .u64_gauge("pathlimit_rules_loaded")
                .with_description("Number of rate limit patterns in the active configuration")
                .build(),

            build_info: meter
                .u64_gauge("pathlimit_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    fn request_attrs(app: &str, pattern: &str, key: &str) -> [KeyValue; 3] {
        [
            KeyValue::new(labels::APP, app.to_string()),
            KeyValue::new(labels::PATTERN, pattern.to_string()),
            KeyValue::new(labels::KEY, key.to_string()),
        ]
    }

    pub fn record_rate_limit_request(&self, app: &str, pattern: &str, key: &str) {
        self.rate_limit_requests_total
            .add(1, &Self::request_attrs(app, pattern, key));
    }

    pub fn record_rate_limit_rejection(&self, app: &str, pattern: &str, key: &str) {
        self.rate_limit_rejected_total
            .add(1, &Self::request_attrs(app, pattern, key));
    }

    pub fn record_rate_limit_would_reject(&self, app: &str, pattern: &str, key: &str) {
        self.rate_limit_would_reject_total
            .add(1, &Self::request_attrs(app, pattern, key));
    }

    pub fn record_rate_limit_override_allowed(&self, app: &str, pattern: &str, key: &str) {
        self.rate_limit_override_allowed_total
            .add(1, &Self::request_attrs(app, pattern, key));
    }

    pub fn record_config_reload(&self, app: &str, result: &str) {
        self.config_reloads_total.add(
            1,
            &[
                KeyValue::new(labels::APP, app.to_string()),
                KeyValue::new(labels::RESULT, result.to_string()),
            ],
        );
    }

    pub fn record_rules_loaded(&self, app: &str, count: usize) {
        self.rules_loaded
            .record(count as u64, &[KeyValue::new(labels::APP, app.to_string())]);
    }
}

/// Build a meter provider exporting into `registry`.
pub fn meter_provider(
    registry: &Registry,
) -> Result<SdkMeterProvider, Box<dyn std::error::Error + Send + Sync>> {
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    Ok(SdkMeterProvider::builder().with_reader(exporter).build())
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    global::set_meter_provider(meter_provider(&registry)?);

    let meter = global::meter("pathlimit");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
