pub mod auth;
pub mod category;
pub mod product;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use category::category_router;
use product::product_router;

pub fn public_api_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .merge(category_router(db.clone()))
        .merge(product_router(db))
}
