use anyhow::Result;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weather_gateway::api;
use weather_gateway::app::App;
use weather_gateway::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = App::from_config(&config).await?;

    let cancel = CancellationToken::new();
    let cleaners = app.spawn_cleaners(config.cleaner_interval, &cancel);

    let router = api::router(app.gateway.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("🦀 Weather gateway starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Shutting down, waiting for cleaners and pending cache writes");
    cancel.cancel();
    for cleaner in cleaners {
        let _ = cleaner.await;
    }
    app.tasks.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
