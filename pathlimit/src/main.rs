#![forbid(unsafe_code)]

use clap::Parser;
use pathlimit_lib::config::{load_from_path, LoggingConfig, RateLimitConfig, TelemetryConfig};
use pathlimit_lib::rate_limit::{
    supervise_config_refresh, FileConfigSource, RateLimitManager, RuleTable, StaticOverrides,
};
use pathlimit_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const REFRESH_RESTART_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Pattern-scoped fixed-window rate limiter")]
struct Cli {
    /// Path to configuration file (TOML, or YAML with a .yaml/.yml extension)
    #[arg(short, long, value_name = "FILE", default_value = "pathlimit.toml")]
    config: PathBuf,

    /// Validate the configuration, print the pattern order and exit
    #[arg(long)]
    check: bool,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = load_from_path(&cli.config);
    let (logging, telemetry) = match &loaded {
        Ok(cfg) => (cfg.logging.clone(), cfg.telemetry.clone()),
        Err(_) => (LoggingConfig::default(), TelemetryConfig::default()),
    };
    if let Err(err) = init_tracing(&logging, &telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    let result = if cli.check { check(&cfg) } else { run(cli.config, cfg).await };
    if let Err(err) = result {
        error!(%err, "pathlimit exited with error");
        std::process::exit(1);
    }
}

fn check(cfg: &RateLimitConfig) -> Result<(), BoxError> {
    let table = RuleTable::compile(cfg)?;
    println!(
        "configuration OK: enabled={} mode={:?} hash={:016x}",
        table.is_enabled(),
        table.mode(),
        table.config_hash()
    );
    for (i, rule) in table.rules().iter().enumerate() {
        let windows = rule
            .limiter()
            .windows()
            .iter()
            .map(|w| format!("{}/{:?}", w.limit, w.duration))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:>3}. {}  [{}]", i + 1, rule.pattern(), windows);
    }
    Ok(())
}

async fn run(path: PathBuf, cfg: RateLimitConfig) -> Result<(), BoxError> {
    let (metrics, registry) = init_metrics()?;
    let overrides = Arc::new(StaticOverrides::new(&cfg.overrides));
    let manager = Arc::new(RateLimitManager::new(&cfg, overrides, Some(metrics))?);

    let cancel = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    if let Some(port) = cfg.telemetry.metrics_port {
        let manager = manager.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            if let Err(err) = start_observability_server(port, registry, manager, cancel).await {
                error!(%err, "observability server exited with error");
            }
        });
    }

    let source = Arc::new(FileConfigSource::new(&path));
    tasks.spawn(supervise_config_refresh(
        manager.clone(),
        source,
        cfg.refresh_interval,
        REFRESH_RESTART_DELAY,
        cancel.clone(),
    ));

    info!(path = %path.display(), patterns = ?manager.patterns(), "pathlimit running");

    shutdown_signal().await?;
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        if let Err(err) = res {
            warn!(%err, "background task failed");
        }
    }
    info!("pathlimit stopped");
    Ok(())
}

async fn shutdown_signal() -> Result<(), BoxError> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }
    Ok(())
}
