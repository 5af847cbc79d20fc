//! OANDA JSON structures sent with requests and keys read from responses.

use crate::domain::trading::types::OrderType;
use rust_decimal::Decimal;
use serde::Serialize;

pub const ACCOUNT_KEY: &str = "account";
pub const INSTRUMENTS_KEY: &str = "instruments";
pub const CANDLES_KEY: &str = "candles";
pub const ORDER_FILL_TRANSACTION_KEY: &str = "orderFillTransaction";
pub const TRADE_KEY: &str = "trade";
pub const TRADES_KEY: &str = "trades";

#[derive(Debug, Serialize)]
pub struct OandaOrderRequestWrapper {
    pub order: OandaMarketOrderRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OandaMarketOrderRequest {
    pub instrument: String,
    pub units: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub position_fill: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_on_fill: Option<OandaPriceDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_on_fill: Option<OandaPriceDetails>,
}

#[derive(Debug, Serialize)]
pub struct OandaPriceDetails {
    pub price: String,
}

impl OandaOrderRequestWrapper {
    /// Market order filled with `positionFill = DEFAULT`.
    ///
    /// A zero stop loss or take profit counts as absent.
    pub fn market(
        instrument: &str,
        units: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Self {
        let price_details = |price: Option<Decimal>| {
            price
                .filter(|p| !p.is_zero())
                .map(|p| OandaPriceDetails {
                    price: p.to_string(),
                })
        };

        Self {
            order: OandaMarketOrderRequest {
                instrument: instrument.to_string(),
                units: units.to_string(),
                order_type: OrderType::Market.to_string(),
                position_fill: "DEFAULT".to_string(),
                stop_loss_on_fill: price_details(stop_loss),
                take_profit_on_fill: price_details(take_profit),
            },
        }
    }
}
