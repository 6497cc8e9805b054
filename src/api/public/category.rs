use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{internal_error, not_found};
use crate::entities::{category, category::Entity as CategoryEntity};
use crate::middleware::logging::{to_response, ApiError};

pub fn category_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/category", get(get_categories))
        .route("/category/:id", get(get_category))
        .layer(Extension(db))
}

async fn get_categories(Extension(db): Extension<Arc<DatabaseConnection>>) -> Response {
    let result = CategoryEntity::find()
        .order_by_asc(category::Column::Name)
        .all(&*db)
        .await;

    match result {
        Ok(categories) => {
            let response: Vec<CategoryResponse> =
                categories.into_iter().map(CategoryResponse::new).collect();
            to_response((StatusCode::OK, Json(response)), Ok(()))
        }
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    match CategoryEntity::find_by_id(id).one(&*db).await {
        Ok(Some(categor)) => to_response(
            (StatusCode::OK, Json(CategoryResponse::new(categor))),
            Ok(()),
        ),
        Ok(None) => not_found(format!("No category with {} id was found.", id)),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

#[derive(Serialize)]
pub(crate) struct CategoryResponse {
    id: i32,
    name: String,
    description: String,
}

impl CategoryResponse {
    pub(crate) fn new(value: category::Model) -> CategoryResponse {
        CategoryResponse {
            id: value.id,
            name: value.name,
            description: value.description,
        }
    }
}
