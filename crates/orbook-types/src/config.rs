//! Configuration for an Orbook market registry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrbookError, Result, UserId, constants};

/// Configuration for a single market registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The only identity allowed to create markets.
    pub operator: UserId,
    /// Maximum fractional digits accepted in a limit price.
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    /// Maximum fractional digits accepted in an order quantity.
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
}

fn default_price_precision() -> u32 {
    constants::PRICE_PRECISION
}

fn default_quantity_precision() -> u32 {
    constants::QTY_PRECISION
}

impl RegistryConfig {
    /// Default precision limits with the given operator.
    #[must_use]
    pub fn new(operator: UserId) -> Self {
        Self {
            operator,
            price_precision: constants::PRICE_PRECISION,
            quantity_precision: constants::QTY_PRECISION,
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject precision settings whose notional would not be exact.
    pub fn validate(&self) -> Result<()> {
        let combined = self.price_precision + self.quantity_precision;
        if combined > constants::MAX_COMBINED_PRECISION {
            return Err(OrbookError::Configuration(format!(
                "price_precision + quantity_precision = {combined} exceeds {}",
                constants::MAX_COMBINED_PRECISION
            )));
        }
        Ok(())
    }

    /// Check a limit price: strictly positive, within precision.
    pub fn check_price(&self, price: Decimal) -> Result<()> {
        check_amount("price", price, self.price_precision)
    }

    /// Check an order quantity: strictly positive, within precision.
    pub fn check_quantity(&self, quantity: Decimal) -> Result<()> {
        check_amount("quantity", quantity, self.quantity_precision)
    }

    /// Every placement-time parameter check for a limit order.
    pub fn check_order(&self, price: Decimal, quantity: Decimal) -> Result<()> {
        check_order(price, quantity, self.price_precision, self.quantity_precision)
    }
}

/// `value` must be strictly positive with at most `precision` significant
/// fractional digits. `what` names the field in the error.
pub fn check_amount(what: &str, value: Decimal, precision: u32) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(OrbookError::invalid(format!("{what} must be positive, got {value}")));
    }
    if value.normalize().scale() > precision {
        return Err(OrbookError::invalid(format!(
            "{what} {value} exceeds {precision} fractional digits"
        )));
    }
    Ok(())
}

/// Exclusive upper bound on `price * quantity` for an order:
/// `10^(28 - price_precision - quantity_precision)`.
///
/// Below it the exact product, and every fill carved out of it, fits in a
/// `Decimal` mantissa with all fractional digits intact.
#[must_use]
pub fn max_notional(price_precision: u32, quantity_precision: u32) -> Decimal {
    let digits = constants::MAX_COMBINED_PRECISION
        .saturating_sub(price_precision.saturating_add(quantity_precision));
    Decimal::from_i128_with_scale(10_i128.pow(digits), 0)
}

/// Price and quantity checks plus the [`max_notional`] bound.
pub fn check_order(
    price: Decimal,
    quantity: Decimal,
    price_precision: u32,
    quantity_precision: u32,
) -> Result<()> {
    check_amount("price", price, price_precision)?;
    check_amount("quantity", quantity, quantity_precision)?;
    let limit = max_notional(price_precision, quantity_precision);
    match price.checked_mul(quantity) {
        Some(product) if product < limit => Ok(()),
        _ => Err(OrbookError::invalid(format!(
            "notional of {quantity} at {price} must stay below {limit}"
        ))),
    }
}
