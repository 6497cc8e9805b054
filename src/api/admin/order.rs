use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{
    checkout_error, db_error, internal_error, not_found,
    user::order::{OrderResponse, OrderSummary},
};
use crate::checkout;
use crate::entities::{
    order::{self, Entity as OrderEntity, PaymentMethod, Status},
    order_item,
};
use crate::middleware::logging::{to_response, ApiError};

const PAGE_SIZE: u64 = 10;

//ROUTERS
pub fn admin_order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/order", get(admin_get_orders))
        .route("/order/:id", get(admin_get_order).patch(patch_order_status))
        .layer(Extension(db))
}

//ROUTES
async fn admin_get_orders(
    Query(params): Query<AdminOrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let mut half_result = OrderEntity::find();
    if let Some(status) = params.status {
        half_result = half_result.filter(order::Column::Status.eq(status));
    }

    let paginator = half_result
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .paginate(&*db, PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);

    let pages = match paginator.num_pages().await {
        Ok(pages) => pages,
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    match paginator.fetch_page(page - 1).await {
        Ok(orders) => {
            let items: Vec<OrderSummary> = orders.into_iter().map(OrderSummary::new).collect();
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

async fn admin_get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Response {
    let order = match OrderEntity::find_by_id(id).one(&*db).await {
        Ok(Some(order)) => order,
        Ok(None) => return not_found(format!("No order with {} id was found", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    match order.find_related(order_item::Entity).all(&*db).await {
        Ok(items) => to_response(
            (StatusCode::OK, Json(OrderResponse::new(order, items))),
            Ok(()),
        ),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn patch_order_status(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchOrderStatus>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let order = match OrderEntity::find_by_id(id).one(&txn).await {
        Ok(Some(order)) => order,
        Ok(None) => return not_found(format!("No order with {} id was found", id)),
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    match checkout::transition(&txn, order, payload.status, payload.payment_method).await {
        Ok(updated) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": format!("Order #{} is now {}", updated.id, updated.status),
                        "order": OrderSummary::new(updated)
                    })),
                ),
                Ok(()),
            ),
            Err(err) => db_error(err),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            checkout_error(err)
        }
    }
}

//Structs
#[derive(Deserialize)]
struct AdminOrdersQuery {
    status: Option<Status>,
    page: Option<u64>,
}

#[derive(Deserialize)]
struct PatchOrderStatus {
    status: Status,
    payment_method: Option<PaymentMethod>,
}
