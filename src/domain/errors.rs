use reqwest::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

/// Result of every call made through the OANDA client
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced by the OANDA client.
///
/// Nothing here is fatal: every variant renders a JSON diagnostic through
/// [`ApiError::payload`] so callers can branch on the broker's own error body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// DNS, connection, timeout or an undecodable response body
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: Value },

    #[error("Unsupported HTTP verb: {0}")]
    UnsupportedVerb(String),

    #[error("Response is missing '{key}'")]
    MissingField { key: String, payload: Value },

    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("Instrument not found: {0}")]
    UnknownInstrument(String),

    #[error("Missing or invalid tradeID")]
    InvalidTradeId,

    #[error("Invalid direction: {0}")]
    InvalidDirection(i64),
}

impl ApiError {
    pub fn missing_field(key: &str, payload: Value) -> Self {
        ApiError::MissingField {
            key: key.to_string(),
            payload,
        }
    }

    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Decode {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    /// Diagnostic JSON for this failure, shaped the way the broker reports errors.
    pub fn payload(&self) -> Value {
        match self {
            ApiError::Transport(message) => json!({ "Exception": message }),
            ApiError::UnexpectedStatus { body, .. } => body.clone(),
            ApiError::UnsupportedVerb(verb) => {
                json!({ "error": format!("Unsupported HTTP verb: {}", verb) })
            }
            ApiError::MissingField { payload, .. } => payload.clone(),
            ApiError::Decode { message, .. } => json!({ "Exception": message }),
            ApiError::UnknownInstrument(_) => json!({ "error": "Invalid instrument" }),
            ApiError::InvalidTradeId => json!({ "errorMessage": "Missing or invalid tradeID" }),
            ApiError::InvalidDirection(_) => json!({ "error": "Invalid direction" }),
        }
    }

    /// HTTP status returned by the broker, when the failure came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the call was rejected before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ApiError::UnsupportedVerb(_)
                | ApiError::UnknownInstrument(_)
                | ApiError::InvalidTradeId
                | ApiError::InvalidDirection(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
