use axum::{extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router};
use chrono::Duration;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::api::{db_error, error_response, internal_error, validation_failed};
use crate::config::AppConfig;
use crate::entities::user::{self, hash_password, Entity as UserEntity, Role};
use crate::middleware::{
    auth::{generate_token, TOKEN_LIFETIME_HOURS},
    logging::{to_response, ApiError},
};
use crate::session::purge_stale;

//ROUTERS
pub fn auth_router(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .layer(Extension(db))
        .layer(Extension(config))
}

//ROUTES
async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateUser>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let password = match hash_password(&payload.password) {
        Ok(password) => password,
        Err(err) => return internal_error(ApiError::PasswordHashFailed(err)),
    };

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        password: Set(password),
        role: Set(Role::User),
        ..Default::default()
    };

    match UserEntity::insert(new_user).exec(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "User registered successfully"
                    })),
                ),
                Ok(()),
            ),
            Err(err) => db_error(err),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            db_error(err)
        }
    }
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Json(payload): Json<UserLogin>,
) -> Response {
    let result = UserEntity::find()
        .filter(user::Column::Username.eq(&*payload.username))
        .one(&*db)
        .await;

    let model = match result {
        Ok(Some(model)) if model.check_hash(&payload.password).is_ok() => model,
        Ok(_) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
                ApiError::General(format!("Failed login for {}", payload.username)),
            )
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    if let Err(err) = purge_stale(&*db, Duration::hours(TOKEN_LIFETIME_HOURS)).await {
        tracing::warn!(error = %err, "Failed to purge stale sessions");
    }

    let sid = Uuid::new_v4().to_string();
    match generate_token(&config.secret, model.id, model.role, sid) {
        Ok(token) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "token": token
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::TokenGenerationFailed(err.to_string())),
    }
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct CreateUser {
    #[validate(length(min = 3, max = 150))]
    username: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Deserialize, Debug)]
struct UserLogin {
    username: String,
    password: String,
}
