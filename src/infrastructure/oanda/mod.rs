//! OANDA v20 REST adapter.
//!
//! Provides [OandaClient]: account accessors, candles, market orders and trade
//! management over a single bearer-token session.

pub mod client;
pub mod models;

pub use client::{ApiRequest, OandaClient};
