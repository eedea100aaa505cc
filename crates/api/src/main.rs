use anyhow::Context;

use factoring_api::app::{build_app, build_services};
use factoring_api::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    factoring_observability::init();

    let config = ServerConfig::from_env();
    let services = build_services(&config)?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
