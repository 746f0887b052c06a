use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lapreplay::config::Config;
use lapreplay::provider::Provider;
use lapreplay::providers::FileProvider;
use lapreplay::server::{AppState, GeneratorInfo, build_router};
use lapreplay::{
    CycleScheduler, EntityContext, GenerationCycle, OrionSink, QueryFacade, SimulationClock, Sink,
};

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_level);
    config.validate().context("invalid configuration")?;

    let clock = SimulationClock::start();
    info!(
        orion_url = %config.orion_url,
        session = %config.session(),
        driver = %config.target_driver_code,
        interval_secs = config.schedule_interval_seconds,
        simulation_session_key = config.session_key,
        data_dir = %config.data_dir.display(),
        origin_utc = %clock.origin_utc(),
        "Starting lap replay generator"
    );

    let provider: Arc<dyn Provider> = Arc::new(FileProvider::new(&config.data_dir));
    let sink: Arc<dyn Sink> = Arc::new(
        OrionSink::new(&config.orion_url, config.sink_timeout())
            .context("failed to build context broker client")?,
    );

    let cycle = GenerationCycle::new(
        Arc::clone(&provider),
        sink,
        config.session(),
        config.target_driver_code.clone(),
        EntityContext::new(config.session_key),
    );
    let scheduler = Arc::new(CycleScheduler::spawn(cycle, clock, config.interval()));

    let state = AppState::new(
        QueryFacade::new(provider),
        Arc::clone(&scheduler),
        GeneratorInfo::from(&config),
    );
    let app = build_router(state);

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down background scheduler");
    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
