use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates the HTTP client shared by every call of one OANDA session.
    ///
    /// The bearer token and JSON content type are default headers, so a
    /// per-request header with the same name replaces them.
    pub fn create_client(api_key: &str) -> Result<Client> {
        Client::builder()
            .default_headers(Self::default_headers(api_key)?)
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to build HTTP client")
    }

    pub fn default_headers(api_key: &str) -> Result<HeaderMap> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .context("OANDA API key is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
