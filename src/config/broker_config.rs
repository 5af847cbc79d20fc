//! Broker configuration parsing from environment variables.
//!
//! Loads the OANDA v20 REST settings: base URL, bearer token and account id.
//! Binaries call `dotenvy::dotenv()` first so a local `.env` file is honoured.

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const PRACTICE_API_URL: &str = "https://api-fxpractice.oanda.com/v3";
pub const LIVE_API_URL: &str = "https://api-fxtrade.oanda.com/v3";

/// Which OANDA environment the default base URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientEnvironment {
    #[default]
    Practice,
    Live,
}

impl ClientEnvironment {
    pub fn api_base_url(&self) -> &'static str {
        match self {
            ClientEnvironment::Practice => PRACTICE_API_URL,
            ClientEnvironment::Live => LIVE_API_URL,
        }
    }
}

impl FromStr for ClientEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "practice" | "demo" => Ok(ClientEnvironment::Practice),
            "live" | "trade" => Ok(ClientEnvironment::Live),
            _ => anyhow::bail!(
                "Invalid OANDA_ENVIRONMENT: {}. Must be 'practice' or 'live'",
                s
            ),
        }
    }
}

/// OANDA API configuration
#[derive(Clone, Default)]
pub struct OandaConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub account_id: String,
}

// The bearer token never reaches logs.
impl fmt::Debug for OandaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OandaConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl OandaConfig {
    pub fn new(
        api_base_url: impl Into<String>,
        api_key: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
            account_id: account_id.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// `OANDA_API_BASE_URL` wins over the URL derived from `OANDA_ENVIRONMENT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("OANDA_ENVIRONMENT") {
            Some(value) => ClientEnvironment::from_str(&value)?,
            None => ClientEnvironment::default(),
        };

        Ok(Self {
            api_base_url: lookup("OANDA_API_BASE_URL")
                .unwrap_or_else(|| environment.api_base_url().to_string()),
            api_key: lookup("OANDA_API_KEY").unwrap_or_default(),
            account_id: lookup("OANDA_ACCOUNT_ID").unwrap_or_default(),
        })
    }

    /// Checks that the config can be used to reach the API.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid OANDA base URL: {}", self.api_base_url))?;

        if self.api_key.trim().is_empty() {
            anyhow::bail!("OANDA_API_KEY is not set");
        }
        if self.account_id.trim().is_empty() {
            anyhow::bail!("OANDA_ACCOUNT_ID is not set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_oanda_config_defaults_to_practice() {
        let config = OandaConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, PRACTICE_API_URL);
        assert!(config.api_key.is_empty());
        assert!(config.account_id.is_empty());
    }

    #[test]
    fn test_live_environment_switches_base_url() {
        let config =
            OandaConfig::from_lookup(lookup_from(&[("OANDA_ENVIRONMENT", "live")])).unwrap();
        assert_eq!(config.api_base_url, LIVE_API_URL);
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = OandaConfig::from_lookup(lookup_from(&[
            ("OANDA_ENVIRONMENT", "live"),
            ("OANDA_API_BASE_URL", "http://localhost:8080/v3"),
            ("OANDA_API_KEY", "token"),
            ("OANDA_ACCOUNT_ID", "101-004-1"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080/v3");
        assert_eq!(config.account_id, "101-004-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_environment_is_rejected() {
        assert!(OandaConfig::from_lookup(lookup_from(&[("OANDA_ENVIRONMENT", "paper")])).is_err());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = OandaConfig::new(PRACTICE_API_URL, "", "101-004-1");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OANDA_API_KEY"));

        let config = OandaConfig::new("not a url", "token", "101-004-1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = OandaConfig::new(PRACTICE_API_URL, "super-secret", "101");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
