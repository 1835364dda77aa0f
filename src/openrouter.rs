//! Shared HTTP client construction for OpenAI-compatible gateways.
//!
//! OpenRouter attributes traffic through the `HTTP-Referer` and `X-Title` headers; every client
//! built here carries them (when configured) along with the bearer token.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::Config;

const USER_AGENT: &str = concat!("tendermatch/", env!("CARGO_PKG_VERSION"));

/// Errors raised while building an HTTP client.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// A configured header contained characters not allowed in HTTP headers.
    #[error("Invalid value for header {0}")]
    InvalidHeader(&'static str),
    /// `reqwest` rejected the client configuration.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Optional attribution headers.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    /// Sent as `X-Title`.
    pub app_name: Option<String>,
    /// Sent as `HTTP-Referer`.
    pub app_url: Option<String>,
}

impl Attribution {
    /// Attribution configured through `OPENROUTER_APP_NAME` / `OPENROUTER_APP_URL`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_name: config.openrouter_app_name.clone(),
            app_url: config.openrouter_app_url.clone(),
        }
    }
}

/// Build a client with a per-request timeout, optional bearer token and attribution headers.
pub fn build_client(
    timeout: Duration,
    api_key: Option<&str>,
    attribution: &Attribution,
) -> Result<Client, HttpClientError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
        headers.insert(AUTHORIZATION, header_value("Authorization", &format!("Bearer {key}"))?);
    }
    if let Some(url) = &attribution.app_url {
        headers.insert(
            HeaderName::from_static("http-referer"),
            header_value("HTTP-Referer", url)?,
        );
    }
    if let Some(name) = &attribution.app_name {
        headers.insert(HeaderName::from_static("x-title"), header_value("X-Title", name)?);
    }

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// Join a base URL and a path with exactly one slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, HttpClientError> {
    HeaderValue::from_str(value).map_err(|_| HttpClientError::InvalidHeader(name))
}
