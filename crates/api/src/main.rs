use anyhow::Context;

use rollcall_api::{app, config::Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rollcall_observability::init();

    let settings = Settings::from_env()?;
    let wiring = app::services::build_services(&settings).await?;
    let app = app::build_app(wiring);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, site_url = %settings.site_url, "listening");

    axum::serve(listener, app).await.context("server error")
}
