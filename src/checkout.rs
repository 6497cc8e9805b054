use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, IntoActiveModel, Set};
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use crate::cart::{Cart, CartLines};
use crate::entities::{
    order::{self, PaymentMethod, Status},
    order_item,
};
use crate::pricing::round2;
use crate::session::SessionError;

const TRANSACTION_PREFIX: &str = "TX";
const TRANSACTION_SUFFIX_LEN: usize = 6;
const TRANSACTION_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,19}$").expect("phone regex is valid"));

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("No order with {0} id was found")]
    NotFound(i32),
    #[error("Cannot cancel an order that is {0}")]
    CannotCancel(Status),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },
    #[error("A payment method is required")]
    PaymentMethodRequired,
    #[error("Quantity of product {0} is too large to order")]
    QuantityTooLarge(i32),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ShippingInfo {
    #[validate(length(min = 1, max = 500, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(regex(path = *PHONE_REGEX, message = "Invalid phone number"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub shipping_city: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub shipping_zipcode: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub shipping_country: String,
    #[serde(default)]
    pub notes: String,
}

/// Order totals, each line rounded before it is summed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn from_lines(lines: &CartLines) -> Self {
        let subtotal = lines.subtotal();
        let tax_total = lines.tax_total();
        OrderTotals {
            subtotal,
            tax_total,
            total: round2(subtotal + tax_total),
        }
    }
}

/// Turns the cart into a pending order and clears it.
///
/// `conn` should be a transaction: the order, its items and the emptied cart
/// are only durable together, so a failed checkout keeps the cart intact.
pub async fn create_order<C: ConnectionTrait>(
    conn: &C,
    cart: &mut Cart<'_>,
    shipping: ShippingInfo,
    user_id: i32,
) -> Result<(order::Model, Vec<order_item::Model>), CheckoutError> {
    let lines = cart.lines(conn).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let quantities = lines
        .iter()
        .map(|line| {
            i32::try_from(line.quantity).map_err(|_| CheckoutError::QuantityTooLarge(line.product.id))
        })
        .collect::<Result<Vec<i32>, _>>()?;

    let totals = OrderTotals::from_lines(&lines);
    let now = Utc::now();
    let order = order::ActiveModel {
        user_id: Set(user_id),
        status: Set(Status::Pending),
        payment_method: Set(None),
        paid: Set(false),
        paid_at: Set(None),
        transaction_id: Set(None),
        subtotal: Set(totals.subtotal),
        tax_total: Set(totals.tax_total),
        total: Set(totals.total),
        shipping_address: Set(shipping.shipping_address),
        shipping_city: Set(shipping.shipping_city),
        shipping_zipcode: Set(shipping.shipping_zipcode),
        shipping_country: Set(shipping.shipping_country),
        phone_number: Set(shipping.phone_number),
        notes: Set(shipping.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (line, quantity) in lines.iter().zip(quantities) {
        let product = &line.product;
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            price: Set(product.price_with_tax()),
            unit_price: Set(product.unit_price),
            tax_percentage: Set(product.tax_percentage),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        items.push(item);
    }

    cart.clear();
    cart.save(conn).await?;

    tracing::info!(
        order_id = order.id,
        user_id,
        items = items.len(),
        total = %order.total,
        "Created order"
    );
    Ok((order, items))
}

pub fn generate_transaction_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TRANSACTION_SUFFIX_LEN)
        .map(|_| TRANSACTION_CHARSET[rng.gen_range(0..TRANSACTION_CHARSET.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        TRANSACTION_PREFIX,
        now.format("%Y%m%d%H%M%S"),
        suffix
    )
}

/// Payment changes for `order`. An existing transaction id or payment date is
/// never replaced.
pub fn payment_update(
    order: order::Model,
    method: PaymentMethod,
    now: DateTime<Utc>,
) -> Result<order::ActiveModel, CheckoutError> {
    if !matches!(order.status, Status::Pending | Status::Paid) {
        return Err(CheckoutError::InvalidTransition {
            from: order.status,
            to: Status::Paid,
        });
    }

    let transaction_id = order
        .transaction_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| generate_transaction_id(now));
    let paid_at = order.paid_at.unwrap_or(now);

    let mut active = order.into_active_model();
    active.status = Set(Status::Paid);
    active.paid = Set(true);
    active.payment_method = Set(Some(method));
    active.paid_at = Set(Some(paid_at));
    active.transaction_id = Set(Some(transaction_id));
    active.updated_at = Set(now);
    Ok(active)
}

/// Simulated payment: no gateway is contacted.
pub async fn mark_as_paid<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    method: PaymentMethod,
) -> Result<order::Model, CheckoutError> {
    let order_id = order.id;
    let paid = payment_update(order, method, Utc::now())?.update(conn).await?;
    tracing::info!(
        order_id,
        transaction_id = paid.transaction_id.as_deref().unwrap_or_default(),
        "Order marked as paid"
    );
    Ok(paid)
}

pub async fn cancel<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
) -> Result<order::Model, CheckoutError> {
    if !order.status.can_cancel() {
        return Err(CheckoutError::CannotCancel(order.status));
    }

    let order_id = order.id;
    let mut active = order.into_active_model();
    active.status = Set(Status::Cancelled);
    active.updated_at = Set(Utc::now());
    let cancelled = active.update(conn).await?;
    tracing::info!(order_id, "Order cancelled");
    Ok(cancelled)
}

/// Moves an order to `target`. Payment and cancellation go through their own
/// guards, everything else must be the next fulfilment step.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    target: Status,
    payment_method: Option<PaymentMethod>,
) -> Result<order::Model, CheckoutError> {
    match target {
        Status::Cancelled => cancel(conn, order).await,
        Status::Paid => {
            let method = payment_method
                .or(order.payment_method)
                .ok_or(CheckoutError::PaymentMethodRequired)?;
            mark_as_paid(conn, order, method).await
        }
        _ if order.status.fulfilment_successor() == Some(target) => {
            let order_id = order.id;
            let from = order.status;
            let mut active = order.into_active_model();
            active.status = Set(target);
            active.updated_at = Set(Utc::now());
            let updated = active.update(conn).await?;
            tracing::info!(order_id, from = %from, to = %target, "Order status changed");
            Ok(updated)
        }
        _ => Err(CheckoutError::InvalidTransition {
            from: order.status,
            to: target,
        }),
    }
}
