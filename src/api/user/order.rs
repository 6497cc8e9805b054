use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, Iterable, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{
    checkout_error, db_error, internal_error, not_found, user::cart::load_session,
    validation_failed,
};
use crate::cart::Cart;
use crate::checkout::{self, ShippingInfo};
use crate::config::AppConfig;
use crate::entities::{
    order::{self, Entity as OrderEntity, PaymentMethod, Status},
    order_item,
};
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::pricing::round2;

const PAGE_SIZE: u64 = 10;

//ROUTERS
pub fn order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/order", get(get_orders).post(create_order))
        .route("/order/payment/methods", get(get_payment_methods))
        .route("/order/:id", get(get_order))
        .route("/order/:id/cancel", post(cancel_order))
        .route("/order/:id/pay", post(pay_order))
        .layer(Extension(db))
}

//ROUTES
async fn create_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ShippingInfo>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let mut session = match load_session(&txn, &claims).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut cart = Cart::new(&mut session, &config.cart_session_key);
    // Order, items and the emptied cart commit together or not at all.
    match checkout::create_order(&txn, &mut cart, payload, claims.user_id).await {
        Ok((order, items)) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": format!("Order #{} created successfully", order.id),
                        "order": OrderResponse::new(order, items)
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

async fn get_orders(
    Query(params): Query<OrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let paginator = OrderEntity::find()
        .filter(order::Column::UserId.eq(claims.user_id))
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

async fn get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let order = match OrderEntity::find_by_id(id)
        .filter(order::Column::UserId.eq(claims.user_id))
        .one(&*db)
        .await
    {
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

async fn cancel_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let order = match find_own_order(&txn, id, claims.user_id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    match checkout::cancel(&txn, order).await {
        Ok(order) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": format!("Order #{} cancelled successfully", order.id),
                        "order": OrderSummary::new(order)
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

async fn get_payment_methods() -> Response {
    let methods: Vec<_> = PaymentMethod::iter()
        .map(|method| {
            json!({
                "id": method,
                "label": method.label()
            })
        })
        .collect();

    to_response((StatusCode::OK, Json(methods)), Ok(()))
}

async fn pay_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PayOrder>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let order = match find_own_order(&txn, id, claims.user_id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    match checkout::mark_as_paid(&txn, order, payload.payment_method).await {
        Ok(order) => match txn.commit().await {
            Ok(_) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Payment processed successfully",
                        "order": OrderSummary::new(order)
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

//utils
async fn find_own_order(
    txn: &DatabaseTransaction,
    id: i32,
    user_id: i32,
) -> Result<order::Model, Response> {
    match OrderEntity::find_by_id(id)
        .filter(order::Column::UserId.eq(user_id))
        .one(txn)
        .await
    {
        Ok(Some(order)) => Ok(order),
        Ok(None) => Err(checkout_error(checkout::CheckoutError::NotFound(id))),
        Err(err) => Err(internal_error(ApiError::DbError(err.to_string()))),
    }
}

//Structs
#[derive(Deserialize)]
struct OrdersQuery {
    page: Option<u64>,
}

#[derive(Deserialize)]
struct PayOrder {
    payment_method: PaymentMethod,
}

#[derive(Serialize)]
pub(crate) struct OrderSummary {
    id: i32,
    user_id: i32,
    status: Status,
    paid: bool,
    payment_method: Option<PaymentMethod>,
    paid_at: Option<DateTime<Utc>>,
    transaction_id: Option<String>,
    subtotal: Decimal,
    tax_total: Decimal,
    total: Decimal,
    shipping_address: String,
    shipping_city: String,
    shipping_zipcode: String,
    shipping_country: String,
    phone_number: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderSummary {
    pub(crate) fn new(value: order::Model) -> Self {
        OrderSummary {
            id: value.id,
            user_id: value.user_id,
            status: value.status,
            paid: value.paid,
            payment_method: value.payment_method,
            paid_at: value.paid_at,
            transaction_id: value.transaction_id,
            subtotal: round2(value.subtotal),
            tax_total: round2(value.tax_total),
            total: round2(value.total),
            shipping_address: value.shipping_address,
            shipping_city: value.shipping_city,
            shipping_zipcode: value.shipping_zipcode,
            shipping_country: value.shipping_country,
            phone_number: value.phone_number,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct OrderItemResponse {
    id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    price: Decimal,
    unit_price: Decimal,
    tax_percentage: Decimal,
    cost: Decimal,
    subtotal: Decimal,
    tax_amount: Decimal,
}

impl OrderItemResponse {
    fn new(value: &order_item::Model) -> Self {
        OrderItemResponse {
            id: value.id,
            product_id: value.product_id,
            product_name: value.product_name.clone(),
            quantity: value.quantity,
            price: round2(value.price),
            unit_price: round2(value.unit_price),
            tax_percentage: round2(value.tax_percentage),
            cost: value.cost(),
            subtotal: value.subtotal(),
            tax_amount: value.tax_amount(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct OrderResponse {
    #[serde(flatten)]
    order: OrderSummary,
    items_count: i64,
    items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub(crate) fn new(order: order::Model, items: Vec<order_item::Model>) -> Self {
        OrderResponse {
            order: OrderSummary::new(order),
            items_count: items.iter().map(|item| i64::from(item.quantity)).sum(),
            items: items.iter().map(OrderItemResponse::new).collect(),
        }
    }
}
