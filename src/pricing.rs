use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

pub const DEFAULT_TAX_PERCENTAGE: Decimal = Decimal::from_parts(19, 0, 0, false, 0);

const MIN_UNIT_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const MAX_TAX_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unit price must be at least 0.01, got {0}")]
    UnitPriceTooLow(Decimal),
    #[error("tax percentage must be between 0 and 100, got {0}")]
    TaxOutOfRange(Decimal),
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Rounds half-up to two decimal places and pins the scale to 2, so
/// `119000` and `119000.00` always serialize the same way.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn tax_amount(unit_price: Decimal, tax_percentage: Decimal) -> Decimal {
    round2(unit_price * tax_percentage / Decimal::ONE_HUNDRED)
}

/// Each derived value is rounded on its own before being added, never only
/// the final sum.
pub fn price_with_tax(unit_price: Decimal, tax_percentage: Decimal) -> Decimal {
    round2(unit_price + tax_amount(unit_price, tax_percentage))
}

/// Price inputs of a catalog product, checked before anything is written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceFields {
    pub unit_price: Decimal,
    pub tax_percentage: Decimal,
}

impl PriceFields {
    pub fn new(unit_price: Decimal, tax_percentage: Decimal) -> Result<Self, ValidationError> {
        if unit_price < MIN_UNIT_PRICE {
            return Err(ValidationError::UnitPriceTooLow(unit_price));
        }
        if tax_percentage < Decimal::ZERO || tax_percentage > MAX_TAX_PERCENTAGE {
            return Err(ValidationError::TaxOutOfRange(tax_percentage));
        }

        Ok(PriceFields {
            unit_price: round2(unit_price),
            tax_percentage: round2(tax_percentage),
        })
    }

    pub fn tax_amount(&self) -> Decimal {
        tax_amount(self.unit_price, self.tax_percentage)
    }

    pub fn price_with_tax(&self) -> Decimal {
        price_with_tax(self.unit_price, self.tax_percentage)
    }
}
