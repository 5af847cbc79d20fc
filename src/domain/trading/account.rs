use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `accounts/{id}/summary` under the `account` key.
///
/// Fields not modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub currency: String,
    pub balance: Decimal,
    #[serde(rename = "NAV")]
    pub nav: Decimal,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Decimal,
    #[serde(default)]
    pub margin_used: Decimal,
    #[serde(default)]
    pub margin_available: Decimal,
    #[serde(default)]
    pub open_trade_count: u32,
    #[serde(default)]
    pub open_position_count: u32,
    #[serde(default)]
    pub pending_order_count: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
