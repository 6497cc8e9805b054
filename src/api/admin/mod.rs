pub mod category;
pub mod order;
pub mod product;

use axum::{middleware::from_fn_with_state, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use category::admin_category_router;
use order::admin_order_router;
use product::admin_product_router;

use crate::config::AppConfig;
use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};

pub fn admin_api_router(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(admin_category_router(db.clone()))
        .merge(admin_product_router(db.clone()))
        .merge(admin_order_router(db.clone()))
        .layer(from_fn_with_state(
            AuthState {
                db,
                secret: Arc::from(config.secret.as_str()),
                roles: &[Role::Admin],
            },
            auth_middleware,
        ))
}
