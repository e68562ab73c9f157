use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use logicad::error::Result;
use logicad::executor::Executor;
use logicad::server;
use logicad::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;
    let executor = Arc::new(Executor::new(&settings));
    let app = server::router(executor);

    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    info!(addr = %settings.listen, "logicad listening");
    axum::serve(listener, app).await?;
    Ok(())
}
