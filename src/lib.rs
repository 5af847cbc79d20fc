pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::OandaConfig;
pub use domain::errors::{ApiError, ApiResult};
pub use infrastructure::{ApiRequest, OandaClient};
