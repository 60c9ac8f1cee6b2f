use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use dgms_rag::core::config::AppConfig;
use dgms_rag::core::logging;
use dgms_rag::server::router;
use dgms_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("invalid configuration")?;
    logging::init(&config.server.log_dir);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app: Router = router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
