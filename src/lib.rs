pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod entities;
pub mod middleware;
pub mod pricing;
pub mod session;

use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::entities::{primary_settup, setup_schema};
use crate::middleware::auth::TOKEN_LIFETIME_HOURS;

/// Creates the schema, seeds the configured accounts, drops expired sessions
/// and builds the router.
pub async fn build_app(db: DatabaseConnection, config: AppConfig) -> Result<axum::Router, DbErr> {
    setup_schema(&db).await?;
    primary_settup(&db, &config).await?;
    session::purge_stale(&db, chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).await?;

    Ok(api::create_api_router(Arc::new(db), Arc::new(config)))
}
