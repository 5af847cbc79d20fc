use super::types::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order attached to a trade (take profit / stop loss)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedOrder {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// A trade as reported by `accounts/{id}/trades/{tradeID}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTrade {
    pub id: String,
    pub instrument: String,
    pub price: Decimal,
    pub open_time: DateTime<Utc>,
    #[serde(default)]
    pub state: String,
    pub initial_units: Decimal,
    pub current_units: Decimal,
    #[serde(rename = "realizedPL", default)]
    pub realized_pl: Decimal,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Decimal,
    #[serde(default)]
    pub margin_used: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_order: Option<LinkedOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_order: Option<LinkedOrder>,
}

impl OpenTrade {
    pub fn side(&self) -> OrderSide {
        if self.current_units.is_sign_negative() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }

    pub fn take_profit(&self) -> Option<Decimal> {
        self.take_profit_order.as_ref().and_then(|o| o.price)
    }

    pub fn stop_loss(&self) -> Option<Decimal> {
        self.stop_loss_order.as_ref().and_then(|o| o.price)
    }
}

impl fmt::Display for OpenTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} @ {} (unrealized P/L {})",
            self.id,
            self.side(),
            self.current_units.abs(),
            self.instrument,
            self.price,
            self.unrealized_pl
        )?;
        if let Some(tp) = self.take_profit() {
            write!(f, " TP {}", tp)?;
        }
        if let Some(sl) = self.stop_loss() {
            write!(f, " SL {}", sl)?;
        }
        Ok(())
    }
}
