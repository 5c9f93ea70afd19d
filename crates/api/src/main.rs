use anyhow::Context;

use tenantgate_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantgate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = tenantgate_api::app::build_app(&config)
        .await
        .context("failed to build services")?;

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;

    tracing::info!(addr = %listener.local_addr()?, bearer_mode = ?config.bearer_mode, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
