use anyhow::{Context, Result};

use stockroom_api::cli::{commands, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = commands::new().get_matches();
    let config = Config::from_matches(&matches)?;

    stockroom_observability::init(config.log_format);

    if config.uses_dev_secret {
        tracing::warn!("STOCKROOM_JWT_SECRET not set; using insecure dev default");
    }
    if config.dsn.is_none() {
        tracing::info!("no DSN configured; using in-memory stores");
    }

    let app = stockroom_api::app::build_app(&config)
        .await
        .context("failed to build application")?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
