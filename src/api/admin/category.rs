use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{
    db_error, error_response, internal_error, not_blank, not_found,
    public::category::CategoryResponse, validation_failed,
};
use crate::entities::{category, category::Entity as CategoryEntity, product};
use crate::middleware::logging::{to_response, ApiError};

//ROUTERS
pub fn admin_category_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/category", post(create_category))
        .route(
            "/category/:id",
            get(admin_get_category)
                .patch(patch_category)
                .delete(delete_category),
        )
        .layer(Extension(db))
}

//ROUTES
async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateCategory>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let now = Utc::now();
    let new_category = category::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.unwrap_or_default()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_category.insert(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "Category created successfully",
                        "id": model.id
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

async fn admin_get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let category = match CategoryEntity::find_by_id(id).one(&*db).await {
        Ok(Some(category)) => category,
        Ok(None) => return not_found(format!("No category with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let product_count = product::Entity::find()
        .filter(product::Column::CategoryId.eq(id))
        .count(&*db)
        .await;

    match product_count {
        Ok(product_count) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "category": CategoryResponse::new(category),
                    "product_count": product_count
                })),
            ),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn patch_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCategory>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let category = match CategoryEntity::find_by_id(id).one(&txn).await {
        Ok(Some(category)) => category,
        Ok(None) => return not_found(format!("No category with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let mut category: category::ActiveModel = category.into();
    if let Some(name) = payload.name {
        category.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        category.description = Set(description);
    }
    category.updated_at = Set(Utc::now());

    match category.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Resource patched successfully."
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

async fn delete_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let category = match CategoryEntity::find_by_id(id).one(&txn).await {
        Ok(Some(category)) => category,
        Ok(None) => return not_found(format!("No category with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    // Products keep their category, so the category has to be emptied first.
    match product::Entity::find()
        .filter(product::Column::CategoryId.eq(id))
        .count(&txn)
        .await
    {
        Ok(0) => {}
        Ok(count) => {
            let _ = txn.rollback().await;
            return error_response(
                StatusCode::CONFLICT,
                format!("Category still has {count} products"),
                ApiError::StateGuard(format!("category {id} still referenced")),
            );
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    }

    let category: category::ActiveModel = category.into();
    match category.delete(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Resource deleted successfully."
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

//Struct
#[derive(Deserialize, Validate, Debug)]
struct CreateCategory {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    name: String,
    description: Option<String>,
}

#[derive(Deserialize, Validate)]
struct PatchCategory {
    #[validate(length(max = 100), custom(function = "not_blank"))]
    name: Option<String>,
    description: Option<String>,
}
