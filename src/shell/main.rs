use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use attendance_sync::modules::attendance_sync::adapters::outbound::json_file_identity_store::JsonFileIdentityStore;
use attendance_sync::modules::attendance_sync::adapters::outbound::monday::MondayClient;
use attendance_sync::modules::attendance_sync::adapters::outbound::personio::PersonioClient;
use attendance_sync::modules::attendance_sync::use_cases::run_batch::handler::BatchRunner;
use attendance_sync::shell::config::Config;
use attendance_sync::shell::http::router;
use attendance_sync::shell::scheduler::{Scheduler, WindowedSync};
use attendance_sync::shell::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        board_id = %config.monday.board_id,
        interval_secs = config.sync_interval.as_secs(),
        lookback_days = config.lookback_days,
        concurrency = config.concurrency,
        identity_store = %config.identity_store_path.display(),
        "starting attendance sync"
    );

    let source = Arc::new(
        PersonioClient::new(config.personio.clone()).context("building the Personio client")?,
    );
    let board = Arc::new(
        MondayClient::new(config.monday.clone()).context("building the monday.com client")?,
    );
    let store = Arc::new(JsonFileIdentityStore::new(config.identity_store_path.clone()));
    let runner = BatchRunner::new(
        source,
        board,
        store,
        config.monday.board_id.clone(),
        config.columns.clone(),
    )
    .with_concurrency(config.concurrency);
    let job = Arc::new(WindowedSync::new(runner, config.lookback_days));

    let state = AppState::default();
    let scheduler = Scheduler::new(job, config.sync_interval, state.health.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(scheduler.run(shutdown_rx));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("liveness endpoint: http://{}/health", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;
    scheduler.await.context("scheduler task failed")?;
    Ok(())
}

async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.send_replace(true);
}
