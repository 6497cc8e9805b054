use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::Serialize;

use crate::pricing::{self, PriceFields, ValidationError};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub additional_info: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_percentage: Decimal,
    pub category_id: i32,
    /// Informational only, never decremented by checkout.
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn tax_amount(&self) -> Decimal {
        pricing::tax_amount(self.unit_price, self.tax_percentage)
    }

    pub fn price_with_tax(&self) -> Decimal {
        pricing::price_with_tax(self.unit_price, self.tax_percentage)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Category,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Everything needed to insert a product. Price fields are checked here so
/// nothing is back-filled at save time.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub additional_info: String,
    pub price: PriceFields,
    pub category_id: i32,
    pub stock: i32,
    pub is_active: bool,
}

impl NewProduct {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: String,
        additional_info: String,
        unit_price: Decimal,
        tax_percentage: Option<Decimal>,
        category_id: Option<i32>,
        stock: i32,
        is_active: bool,
    ) -> Result<Self, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        let category_id = category_id.ok_or(ValidationError::MissingField("category"))?;
        let price = PriceFields::new(
            unit_price,
            tax_percentage.unwrap_or(pricing::DEFAULT_TAX_PERCENTAGE),
        )?;

        Ok(NewProduct {
            name: name.trim().to_string(),
            description,
            additional_info,
            price,
            category_id,
            stock: stock.max(0),
            is_active,
        })
    }

    pub fn into_active_model(self) -> ActiveModel {
        let now = Utc::now();
        ActiveModel {
            name: Set(self.name),
            description: Set(self.description),
            additional_info: Set(self.additional_info),
            unit_price: Set(self.price.unit_price),
            tax_percentage: Set(self.price.tax_percentage),
            category_id: Set(self.category_id),
            stock: Set(self.stock),
            is_active: Set(self.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}
