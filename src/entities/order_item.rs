use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::pricing;

/// Price fields are frozen at purchase time and never re-read from the
/// product afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "order_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub order_id: i32,
    pub product_id: i32,
    pub product_name: String,
    /// Tax-inclusive unit price.
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub tax_percentage: Decimal,
    pub quantity: i32,
}

impl Model {
    pub fn cost(&self) -> Decimal {
        pricing::round2(self.price * Decimal::from(self.quantity))
    }

    pub fn subtotal(&self) -> Decimal {
        pricing::round2(self.unit_price * Decimal::from(self.quantity))
    }

    pub fn tax_amount(&self) -> Decimal {
        pricing::round2(
            pricing::tax_amount(self.unit_price, self.tax_percentage) * Decimal::from(self.quantity),
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
