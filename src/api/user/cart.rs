use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{db_error, internal_error, not_found, validation_failed};
use crate::cart::{Cart, CartLine, CartLines};
use crate::config::AppConfig;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::pricing::round2;
use crate::session::Session;

//ROUTERS
pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_product).delete(clear_cart))
        .route("/cart/:product_id", delete(remove_product))
        .layer(Extension(db))
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let mut session = match load_session(&txn, &claims).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let cart = Cart::new(&mut session, &config.cart_session_key);
    match cart.lines(&txn).await {
        Ok(lines) => to_response((StatusCode::OK, Json(CartResponse::new(&lines))), Ok(())),
        Err(err) => internal_error(ApiError::DbError(err.to_string())),
    }
}

async fn add_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddProduct>,
) -> Response {
    if let Err(errors) = payload.validate() {
        return validation_failed(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };

    let product = match ProductEntity::find_by_id(payload.product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(&txn)
        .await
    {
        Ok(Some(product)) => product,
        Ok(None) => {
            return not_found(format!(
                "No product with {} id was found",
                payload.product_id
            ))
        }
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    let mut session = match load_session(&txn, &claims).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let mut cart = Cart::new(&mut session, &config.cart_session_key);
    cart.add(&product, payload.quantity, payload.r#override);

    if let Err(err) = cart.save(&txn).await {
        return internal_error(ApiError::SessionError(err.to_string()));
    }
    let lines = match cart.lines(&txn).await {
        Ok(lines) => lines,
        Err(err) => return internal_error(ApiError::DbError(err.to_string())),
    };

    match txn.commit().await {
        Ok(_) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Product \"{}\" added to cart", product.name),
                    "total_item_count": lines.total_item_count()
                })),
            ),
            Ok(()),
        ),
        Err(err) => db_error(err),
    }
}

async fn remove_product(
    Path(product_id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let mut session = match load_session(&txn, &claims).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut cart = Cart::new(&mut session, &config.cart_session_key);
    if !cart.remove(product_id) {
        // Not in the cart: fine for a known product, 404 for an unknown id.
        return match ProductEntity::find_by_id(product_id).one(&txn).await {
            Ok(Some(_)) => to_response(
                (
                    StatusCode::OK,
                    Json(json!({
                        "message": "Product was not in the cart"
                    })),
                ),
                Ok(()),
            ),
            Ok(None) => not_found(format!("No product with {} id was found", product_id)),
            Err(err) => internal_error(ApiError::DbError(err.to_string())),
        };
    }

    if let Err(err) = cart.save(&txn).await {
        return internal_error(ApiError::SessionError(err.to_string()));
    }
    match txn.commit().await {
        Ok(_) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Product removed from cart"
                })),
            ),
            Ok(()),
        ),
        Err(err) => db_error(err),
    }
}

async fn clear_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(ApiError::TransactionCreationFailed),
    };
    let mut session = match load_session(&txn, &claims).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut cart = Cart::new(&mut session, &config.cart_session_key);
    cart.clear();
    if let Err(err) = cart.save(&txn).await {
        return internal_error(ApiError::SessionError(err.to_string()));
    }

    match txn.commit().await {
        Ok(_) => to_response(
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Cart cleared"
                })),
            ),
            Ok(()),
        ),
        Err(err) => db_error(err),
    }
}

//utils
pub(crate) async fn load_session(
    txn: &DatabaseTransaction,
    claims: &Claims,
) -> Result<Session, Response> {
    Session::load(txn, &claims.sid)
        .await
        .map_err(|err| internal_error(ApiError::SessionError(err.to_string())))
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct AddProduct {
    product_id: i32,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 20))]
    quantity: u32,
    #[serde(default)]
    r#override: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Serialize)]
pub(crate) struct CartLineResponse {
    product_id: i32,
    name: String,
    quantity: u32,
    price: Decimal,
    total_price: Decimal,
    unit_price: Decimal,
    tax_amount: Decimal,
    subtotal: Decimal,
    tax_total: Decimal,
}

impl CartLineResponse {
    fn new(line: &CartLine) -> Self {
        CartLineResponse {
            product_id: line.product.id,
            name: line.product.name.clone(),
            quantity: line.quantity,
            price: round2(line.price),
            total_price: line.total_price(),
            unit_price: round2(line.product.unit_price),
            tax_amount: line.product.tax_amount(),
            subtotal: line.subtotal(),
            tax_total: line.tax_total(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct CartResponse {
    items: Vec<CartLineResponse>,
    total_item_count: u64,
    total_price: Decimal,
    subtotal: Decimal,
    tax_total: Decimal,
    total: Decimal,
}

impl CartResponse {
    pub(crate) fn new(lines: &CartLines) -> Self {
        CartResponse {
            items: lines.iter().map(CartLineResponse::new).collect(),
            total_item_count: lines.total_item_count(),
            total_price: lines.total_price(),
            subtotal: lines.subtotal(),
            tax_total: lines.tax_total(),
            total: lines.total(),
        }
    }
}
