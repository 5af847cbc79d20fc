pub mod core;
pub mod oanda;

pub use oanda::{ApiRequest, OandaClient};
