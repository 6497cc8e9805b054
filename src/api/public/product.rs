use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::api::{internal_error, not_found};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::middleware::logging::{to_response, ApiError};
use crate::pricing::round2;

const PAGE_SIZE: u64 = 12;
const RELATED_LIMIT: u64 = 4;

pub fn product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/product", get(get_products))
        .route("/product/:id", get(get_product))
        .layer(Extension(db))
}

async fn get_products(
    Query(params): Query<GetProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let mut half_result = ProductEntity::find().filter(product::Column::IsActive.eq(true));

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

async fn get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let result = ProductEntity::find_by_id(id)
        .filter(product::Column::IsActive.eq(true))
        .one(&*db)
        .await;

    let prod = match result {
        Ok(Some(prod)) => prod,
        Ok(None) => return not_found(format!("No product with {} id was found.", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let related = ProductEntity::find()
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::CategoryId.eq(prod.category_id))
        .filter(product::Column::Id.ne(prod.id))
        .order_by_desc(product::Column::CreatedAt)
        .limit(RELATED_LIMIT)
        .all(&*db)
        .await;

    match related {
        Ok(related) => {
            let related: Vec<PublicProductResponse> =
                related.into_iter().map(PublicProductResponse::new).collect();
            to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "product": PublicProductResponse::new(prod),
                        "related": related
                    })),
                ),
                Ok(()),
            )
        }
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

#[derive(Deserialize)]
struct GetProductsQuery {
    category: Option<i32>,
    search: Option<String>,
    page: Option<u64>,
}

#[derive(Serialize)]
pub(crate) struct PublicProductResponse {
    id: i32,
    name: String,
    description: String,
    additional_info: String,
    unit_price: Decimal,
    tax_percentage: Decimal,
    tax_amount: Decimal,
    price_with_tax: Decimal,
    category_id: i32,
    stock: i32,
    is_active: bool,
}

impl PublicProductResponse {
    pub(crate) fn new(value: product::Model) -> PublicProductResponse {
        PublicProductResponse {
            tax_amount: value.tax_amount(),
            price_with_tax: value.price_with_tax(),
            id: value.id,
            name: value.name,
            description: value.description,
            additional_info: value.additional_info,
            unit_price: round2(value.unit_price),
            tax_percentage: round2(value.tax_percentage),
            category_id: value.category_id,
            stock: value.stock,
            is_active: value.is_active,
        }
    }
}
