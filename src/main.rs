use sea_orm::{ConnectOptions, Database};
use tracing_subscriber::EnvFilter;

use storefront::{build_app, config::AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let mut options = ConnectOptions::new(config.database_url.clone());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;

    let bind_addr = config.bind_addr.clone();
    let app = build_app(db, config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Storefront listening");
    axum::serve(listener, app).await?;

    Ok(())
}
