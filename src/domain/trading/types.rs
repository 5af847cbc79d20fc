use crate::domain::errors::{ApiError, ApiResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Maps a signed direction to a side: negative sells, positive buys.
    /// Zero has no side and is rejected.
    pub fn from_direction(direction: i64) -> ApiResult<Self> {
        match direction.signum() {
            1 => Ok(OrderSide::Buy),
            -1 => Ok(OrderSide::Sell),
            _ => Err(ApiError::InvalidDirection(direction)),
        }
    }

    /// Multiplier applied to unit sizes (OANDA encodes sells as negative units)
    pub fn sign(&self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
        }
    }
}

/// Signed unit count for an order, rounded to the instrument's precision.
///
/// The magnitude of `units` is used; the side alone decides the sign. A
/// negative precision rounds to tens, hundreds and so on. Ties go to even.
pub fn signed_units(units: Decimal, side: OrderSide, precision: i32) -> Decimal {
    let signed = units.abs() * side.sign();
    let rounded = if precision >= 0 {
        signed.round_dp(precision.unsigned_abs())
    } else {
        let step = Decimal::from(10_i64.pow(precision.unsigned_abs().min(18)));
        (signed / step).round() * step
    };
    rounded.normalize()
}
