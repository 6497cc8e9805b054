pub mod cart;
pub mod order;

use axum::{middleware::from_fn_with_state, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState};
use cart::cart_router;
use order::order_router;

pub fn user_api_router(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(cart_router(db.clone()))
        .merge(order_router(db.clone()))
        .layer(Extension(config.clone()))
        .layer(from_fn_with_state(
            AuthState {
                db,
                secret: Arc::from(config.secret.as_str()),
                roles: &[Role::User, Role::Admin],
            },
            auth_middleware,
        ))
}
