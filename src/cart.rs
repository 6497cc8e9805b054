use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::entities::product::{self, Entity as ProductEntity};
use crate::pricing::round2;
use crate::session::{Session, SessionError};

/// One stored cart entry. The price is the tax-inclusive price captured the
/// first time the product was added and is never refreshed.
#[derive(Clone, Debug, PartialEq)]
pub struct CartEntry {
    pub quantity: u32,
    pub price: Decimal,
    pub name: Option<String>,
}

#[derive(Serialize)]
struct StoredEntry<'a> {
    quantity: u32,
    price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Stored data could not be read back.
    Corrupt(String),
    /// Product was deleted or deactivated.
    Unavailable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LineResolution {
    Resolved(CartLine),
    Skipped { product_id: i32, reason: SkipReason },
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub product: product::Model,
    pub quantity: u32,
    /// Snapshot price from the session, not the live catalog price.
    pub price: Decimal,
}

impl CartLine {
    pub fn total_price(&self) -> Decimal {
        round2(self.price * Decimal::from(self.quantity))
    }

    pub fn subtotal(&self) -> Decimal {
        round2(self.product.unit_price * Decimal::from(self.quantity))
    }

    pub fn tax_total(&self) -> Decimal {
        round2(self.product.tax_amount() * Decimal::from(self.quantity))
    }
}

/// The lines of a cart that still resolve against the catalog. Iterating it
/// never hits the database again, so it can be walked as often as needed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartLines {
    lines: Vec<CartLine>,
}

impl CartLines {
    pub fn from_resolutions(resolutions: Vec<LineResolution>) -> Self {
        let lines = resolutions
            .into_iter()
            .filter_map(|resolution| match resolution {
                LineResolution::Resolved(line) => Some(line),
                LineResolution::Skipped { .. } => None,
            })
            .collect();
        CartLines { lines }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of snapshot price times quantity.
    pub fn total_price(&self) -> Decimal {
        round2(self.lines.iter().map(CartLine::total_price).sum())
    }

    /// Sum of live unit price times quantity.
    pub fn subtotal(&self) -> Decimal {
        round2(self.lines.iter().map(CartLine::subtotal).sum())
    }

    pub fn tax_total(&self) -> Decimal {
        round2(self.lines.iter().map(CartLine::tax_total).sum())
    }

    pub fn total(&self) -> Decimal {
        round2(self.subtotal() + self.tax_total())
    }
}

impl<'a> IntoIterator for &'a CartLines {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Session-backed cart. Every mutation is written straight back into the
/// session and marks it modified; [`Cart::save`] flushes the session.
pub struct Cart<'s> {
    session: &'s mut Session,
    key: String,
    entries: BTreeMap<i32, CartEntry>,
    dropped: Vec<(String, SkipReason)>,
}

impl<'s> Cart<'s> {
    pub fn new(session: &'s mut Session, key: &str) -> Self {
        let (entries, dropped) = match session.get(key) {
            Some(Value::Object(raw)) => parse_entries(raw),
            Some(_) => {
                tracing::warn!(session = session.key(), "Cart data is not a map, ignoring it");
                (BTreeMap::new(), Vec::new())
            }
            None => (BTreeMap::new(), Vec::new()),
        };

        for (raw_key, reason) in &dropped {
            tracing::warn!(session = session.key(), entry = %raw_key, ?reason, "Dropped cart entry");
        }

        Cart {
            session,
            key: key.to_owned(),
            entries,
            dropped,
        }
    }

    /// Inserts the product with its current tax-inclusive price on first add,
    /// then either replaces or accumulates the quantity.
    pub fn add(&mut self, product: &product::Model, quantity: u32, override_quantity: bool) {
        let entry = self.entries.entry(product.id).or_insert_with(|| CartEntry {
            quantity: 0,
            price: product.price_with_tax(),
            name: Some(product.name.clone()),
        });

        if override_quantity {
            entry.quantity = quantity;
        } else {
            entry.quantity = entry.quantity.saturating_add(quantity);
        }

        if entry.quantity == 0 {
            self.entries.remove(&product.id);
        }
        self.write_back();
    }

    /// Returns whether an entry was removed. Absent products are a no-op.
    pub fn remove(&mut self, product_id: i32) -> bool {
        if self.entries.remove(&product_id).is_none() {
            return false;
        }
        self.write_back();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.session.remove(&self.key);
    }

    pub fn get(&self, product_id: i32) -> Option<&CartEntry> {
        self.entries.get(&product_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (i32, &CartEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries thrown away while reading the session.
    pub fn dropped(&self) -> &[(String, SkipReason)] {
        &self.dropped
    }

    /// Looks up every referenced product that is still active and tags each
    /// entry as resolved or skipped.
    pub async fn resolve<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<LineResolution>, DbErr> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = self.entries.keys().copied().collect();
        let products = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids))
            .filter(product::Column::IsActive.eq(true))
            .all(conn)
            .await?;

        Ok(self.resolve_against(products))
    }

    pub fn resolve_against(&self, products: Vec<product::Model>) -> Vec<LineResolution> {
        let mut by_id: HashMap<i32, product::Model> = products
            .into_iter()
            .filter(|product| product.is_active)
            .map(|product| (product.id, product))
            .collect();

        self.entries
            .iter()
            .map(|(id, entry)| match by_id.remove(id) {
                Some(product) => LineResolution::Resolved(CartLine {
                    product,
                    quantity: entry.quantity,
                    price: entry.price,
                }),
                None => {
                    tracing::debug!(product_id = id, "Cart entry no longer resolves, skipping");
                    LineResolution::Skipped {
                        product_id: *id,
                        reason: SkipReason::Unavailable,
                    }
                }
            })
            .collect()
    }

    /// Re-queries the catalog on every call.
    pub async fn lines<C: ConnectionTrait>(&self, conn: &C) -> Result<CartLines, DbErr> {
        Ok(CartLines::from_resolutions(self.resolve(conn).await?))
    }

    pub async fn save<C: ConnectionTrait>(&mut self, conn: &C) -> Result<(), SessionError> {
        self.session.save(conn).await
    }

    fn write_back(&mut self) {
        let stored: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| {
                let stored = StoredEntry {
                    quantity: entry.quantity,
                    price: round2(entry.price).to_string(),
                    name: entry.name.as_deref(),
                };
                serde_json::to_value(stored)
                    .ok()
                    .map(|value| (id.to_string(), value))
            })
            .collect();

        self.session.set(&self.key, Value::Object(stored));
    }
}

fn parse_entries(raw: &Map<String, Value>) -> (BTreeMap<i32, CartEntry>, Vec<(String, SkipReason)>) {
    let mut entries = BTreeMap::new();
    let mut dropped = Vec::new();

    for (raw_key, value) in raw {
        match parse_entry(raw_key, value) {
            Ok((id, entry)) => {
                entries.insert(id, entry);
            }
            Err(reason) => dropped.push((raw_key.clone(), SkipReason::Corrupt(reason))),
        }
    }

    (entries, dropped)
}

fn parse_entry(raw_key: &str, value: &Value) -> Result<(i32, CartEntry), String> {
    let id = raw_key
        .parse::<i32>()
        .map_err(|_| format!("product id `{raw_key}` is not a number"))?;

    let quantity = value
        .get("quantity")
        .and_then(Value::as_u64)
        .and_then(|quantity| u32::try_from(quantity).ok())
        .filter(|quantity| *quantity > 0)
        .ok_or_else(|| "quantity is missing or not a positive integer".to_string())?;

    let price = match value.get("price") {
        Some(Value::String(price)) => Decimal::from_str(price).ok(),
        Some(Value::Number(price)) => Decimal::from_str(&price.to_string()).ok(),
        _ => None,
    }
    .filter(|price| !price.is_sign_negative())
    .ok_or_else(|| "price is missing or not a decimal".to_string())?;

    let name = value.get("name").and_then(Value::as_str).map(str::to_owned);

    Ok((id, CartEntry { quantity, price, name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn product(id: i32, unit_price: &str, is_active: bool) -> product::Model {
        product::Model {
            id,
            name: format!("Product {id}"),
            description: String::new(),
            additional_info: String::new(),
            unit_price: Decimal::from_str(unit_price).unwrap(),
            tax_percentage: Decimal::from(19),
            category_id: 1,
            stock: 3,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn accumulates_or_overrides_quantity() {
        let mut session = Session::new("s");
        let shoe = product(1, "100000", true);

        let mut cart = Cart::new(&mut session, "cart");
        cart.add(&shoe, 1, false);
        cart.add(&shoe, 2, false);
        assert_eq!(cart.get(1).unwrap().quantity, 3);

        cart.add(&shoe, 5, true);
        assert_eq!(cart.get(1).unwrap().quantity, 5);
        assert!(session.is_modified());
        assert_eq!(session.get("cart").unwrap()["1"]["quantity"], json!(5));
        assert_eq!(session.get("cart").unwrap()["1"]["price"], json!("119000.00"));
    }

    #[test]
    fn keeps_first_snapshot_price() {
        let mut session = Session::new("s");
        let mut shoe = product(1, "100000", true);

        let mut cart = Cart::new(&mut session, "cart");
        cart.add(&shoe, 1, false);
        shoe.unit_price = dec("150000");
        cart.add(&shoe, 1, false);

        let entry = cart.get(1).unwrap();
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.price, dec("119000.00"));
    }

    #[test]
    fn removing_absent_product_leaves_session_untouched() {
        let mut session = Session::new("s");
        let mut cart = Cart::new(&mut session, "cart");
        assert!(!cart.remove(42));
        cart.clear();
        assert!(!session.is_modified());
    }

    #[test]
    fn corrupt_entries_are_dropped_on_load() {
        let mut session = Session::new("s");
        session.set(
            "cart",
            json!({
                "1": {"quantity": 2, "price": "119000.00"},
                "2": {"quantity": "two", "price": "10.00"},
                "3": {"quantity": 1, "price": "abc"},
                "4": {"quantity": 0, "price": "10.00"},
                "five": {"quantity": 1, "price": "10.00"},
            }),
        );

        let cart = Cart::new(&mut session, "cart");
        let ids: Vec<i32> = cart.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(cart.dropped().len(), 4);
    }

    #[test]
    fn inactive_and_missing_products_are_pruned_from_totals() {
        let mut session = Session::new("s");
        let active = product(1, "100000", true);
        let inactive = product(2, "50000", false);
        let deleted = product(3, "10", true);

        let mut cart = Cart::new(&mut session, "cart");
        cart.add(&active, 2, false);
        cart.add(&inactive, 1, false);
        cart.add(&deleted, 4, false);

        let resolutions = cart.resolve_against(vec![active, inactive]);
        assert_eq!(resolutions.len(), 3);
        assert!(matches!(
            resolutions[1],
            LineResolution::Skipped { product_id: 2, reason: SkipReason::Unavailable }
        ));

        let lines = CartLines::from_resolutions(resolutions);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.total_item_count(), 2);
        assert_eq!(lines.total_price(), dec("238000.00"));
        assert_eq!(lines.subtotal(), dec("200000.00"));
        assert_eq!(lines.tax_total(), dec("38000.00"));
        assert_eq!(lines.total(), dec("238000.00"));

        // re-iterable
        assert_eq!(lines.iter().count(), 1);
        assert_eq!((&lines).into_iter().count(), 1);
    }
}
