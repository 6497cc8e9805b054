pub mod admin;
pub mod public;
pub mod user;

use axum::{http::StatusCode, middleware::from_fn, response::Response, Json, Router};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use validator::{ValidationError, ValidationErrors};

use crate::checkout::CheckoutError;
use crate::config::AppConfig;
use crate::middleware::logging::{logging_middleware, to_response, ApiError};
use admin::admin_api_router;
use public::{auth::auth_router, public_api_router};
use user::user_api_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .merge(auth_router(shared_db.clone(), config.clone()))
        .nest("/api", public_api_router(shared_db.clone()))
        .nest("/api", user_api_router(shared_db.clone(), config.clone()))
        .nest("/api/admin", admin_api_router(shared_db, config))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

//Shared responses
pub(crate) fn internal_error(ext: ApiError) -> Response {
    to_response(
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Internal server error"
            })),
        ),
        Err(ext),
    )
}

pub(crate) fn error_response(status: StatusCode, message: String, ext: ApiError) -> Response {
    to_response(
        (
            status,
            Json(json!({
                "error": message
            })),
        ),
        Err(ext),
    )
}

pub(crate) fn not_found(message: String) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        message.clone(),
        ApiError::NotFound(message),
    )
}

pub(crate) fn validation_failed(errors: ValidationErrors) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        errors.to_string(),
        ApiError::ValidationFail(errors.to_string()),
    )
}

/// Names are stored trimmed, so whitespace alone counts as missing.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn db_error(err: DbErr) -> Response {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => error_response(
            StatusCode::CONFLICT,
            "Resource already exists".to_string(),
            ApiError::DbError(detail),
        ),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => error_response(
            StatusCode::CONFLICT,
            "Resource is still referenced".to_string(),
            ApiError::DbError(detail),
        ),
        _ => internal_error(ApiError::DbError(err.to_string())),
    }
}

pub(crate) fn checkout_error(err: CheckoutError) -> Response {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::PaymentMethodRequired
        | CheckoutError::QuantityTooLarge(_) => error_response(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            ApiError::ValidationFail(err.to_string()),
        ),
        CheckoutError::NotFound(_) => not_found(err.to_string()),
        CheckoutError::CannotCancel(_) | CheckoutError::InvalidTransition { .. } => error_response(
            StatusCode::CONFLICT,
            err.to_string(),
            ApiError::StateGuard(err.to_string()),
        ),
        CheckoutError::Db(err) => db_error(err),
        CheckoutError::Session(err) => internal_error(ApiError::SessionError(err.to_string())),
    }
}
