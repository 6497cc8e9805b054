use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{
    db_error, error_response, internal_error, not_blank, not_found,
    public::product::PublicProductResponse, validation_failed,
};
use crate::entities::{
    category,
    product::{self, Entity as ProductEntity, NewProduct},
};
use crate::middleware::logging::{to_response, ApiError};
use crate::pricing::{PriceFields, ValidationError};

const PAGE_SIZE: u64 = 10;

//ROUTERS
pub fn admin_product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/product", post(create_product).get(admin_get_products))
        .route(
            "/product/:id",
            get(admin_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .layer(Extension(db))
}

//ROUTES
async fn admin_get_products(
    Query(params): Query<AdminProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let mut half_result = ProductEntity::find();

    if let Some(category_id) = params.category {
        half_result = half_result.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        half_result = half_result.filter(product::Column::Name.contains(search));
    }

    let paginator = half_result
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .paginate(&*db, PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);

    let pages = match paginator.num_pages().await {
        Ok(pages) => pages,
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    match paginator.fetch_page(page - 1).await {
        Ok(products) => {
            let items: Vec<PublicProductResponse> =
                products.into_iter().map(PublicProductResponse::new).collect();
            to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "page": page,
                        "pages": pages,
                        "items": items
                    })),
                ),
                Ok(()),
            )
        }
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn admin_get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    match ProductEntity::find_by_id(id).one(&*db).await {
        Ok(Some(prod)) => to_response(
            (StatusCode::OK, Json(PublicProductResponse::new(prod))),
            Ok(()),
        ),
        Ok(None) => not_found(format!("No product with {} id was found.", id)),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateProduct>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let new_product = match NewProduct::new(
        payload.name,
        payload.description.unwrap_or_default(),
        payload.additional_info.unwrap_or_default(),
        payload.unit_price,
        payload.tax_percentage,
        payload.category_id,
        payload.stock.unwrap_or_default(),
        payload.is_active.unwrap_or(true),
    ) {
        Ok(new_product) => new_product,
        Err(err) => return price_validation_failed(err),
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    if let Err(response) = ensure_category(&txn, new_product.category_id).await {
        return response;
    }

    match new_product.into_active_model().insert(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "Product created successfully",
                        "product": PublicProductResponse::new(model)
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

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchProductPayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let existing = match ProductEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => return not_found(format!("No product with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let price = match PriceFields::new(
        payload.unit_price.unwrap_or(existing.unit_price),
        payload.tax_percentage.unwrap_or(existing.tax_percentage),
    ) {
        Ok(price) => price,
        Err(err) => return price_validation_failed(err),
    };

    let mut product: product::ActiveModel = existing.into();
    product.unit_price = Set(price.unit_price);
    product.tax_percentage = Set(price.tax_percentage);

    if let Some(name) = payload.name {
        product.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        product.description = Set(description);
    }
    if let Some(additional_info) = payload.additional_info {
        product.additional_info = Set(additional_info);
    }
    if let Some(category_id) = payload.category_id {
        if let Err(response) = ensure_category(&txn, category_id).await {
            return response;
        }
        product.category_id = Set(category_id);
    }
    if let Some(stock) = payload.stock {
        product.stock = Set(stock);
    }
    if let Some(is_active) = payload.is_active {
        product.is_active = Set(is_active);
    }
    product.updated_at = Set(Utc::now());

    match product.update(&txn).await {
        Ok(model) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Resource patched successfully.",
                        "product": PublicProductResponse::new(model)
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

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let product = match ProductEntity::find_by_id(id).one(&txn).await {
        Ok(Some(product)) => product,
        Ok(None) => return not_found(format!("No product with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    // Ordered products are referenced by order items and can only be deactivated.
    let product: product::ActiveModel = product.into();
    match product.delete(&txn).await {
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

//utils
async fn ensure_category(txn: &DatabaseTransaction, category_id: i32) -> Result<(), Response> {
    match category::Entity::find_by_id(category_id).one(txn).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(not_found(format!(
            "No category with {category_id} id was found"
        ))),
        Err(err) => Err(internal_error(ApiError::DbError(err.to_string()))),
    }
}

fn price_validation_failed(err: ValidationError) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        err.to_string(),
        ApiError::ValidationFail(err.to_string()),
    )
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct CreateProduct {
    #[validate(length(max = 200))]
    name: String,
    description: Option<String>,
    additional_info: Option<String>,
    unit_price: Decimal,
    tax_percentage: Option<Decimal>,
    category_id: Option<i32>,
    #[validate(range(min = 0))]
    stock: Option<i32>,
    is_active: Option<bool>,
}

#[derive(Deserialize)]
struct AdminProductsQuery {
    category: Option<i32>,
    search: Option<String>,
    page: Option<u64>,
}

#[derive(Deserialize, Validate)]
struct PatchProductPayload {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    name: Option<String>,
    description: Option<String>,
    additional_info: Option<String>,
    unit_price: Option<Decimal>,
    tax_percentage: Option<Decimal>,
    category_id: Option<i32>,
    #[validate(range(min = 0))]
    stock: Option<i32>,
    is_active: Option<bool>,
}
