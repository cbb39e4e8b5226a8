use anyhow::Context;
use tracing::info;

use tradeflow_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tradeflow_observability::init();

    let config = AppConfig::from_env()?;
    let (app, background) = tradeflow_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Joining worker threads blocks; keep it off the async executor.
    tokio::task::spawn_blocking(move || background.shutdown()).await?;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
