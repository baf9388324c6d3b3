//! Punch Clock — Binary Entrypoint
//! Loads config, boots the Axum HTTP server, and starts the background jobs
//! (gate ticker every minute, midnight wipe for the in-memory store).

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use punch_clock::config::{Config, LogFormat};
use punch_clock::metrics::Metrics;
use punch_clock::App;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("punch_clock=info,tower_http=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    // Missing or malformed settings stop the process here.
    let cfg = Config::from_env().context("invalid configuration")?;
    init_tracing(cfg.log_format);

    let metrics = Metrics::init().context("installing metrics recorder")?;
    let app = App::from_config(&cfg).await?;
    let _jobs = app.spawn_jobs();

    let router = app.router().merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "Server is running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler failed: {e}");
    }
    tracing::info!("shutting down");
}
