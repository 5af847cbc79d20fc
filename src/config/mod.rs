//! Configuration module for oandatrade.
//!
//! Settings are read from environment variables; binaries load a `.env` file
//! with `dotenvy` before calling [`OandaConfig::from_env`].

mod broker_config;

pub use broker_config::{ClientEnvironment, LIVE_API_URL, OandaConfig, PRACTICE_API_URL};
