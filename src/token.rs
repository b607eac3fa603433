//! Token API adapter
//!
//! Fetches the short-lived auth key over HTTP. The endpoint answers with
//! `{"code": 0, "message": "...", "data": {"token": "..."}}`.

use async_trait::async_trait;
use livesocket::{LiveSocketError, Result, TokenProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: Option<String>,
}

/// [`TokenProvider`] backed by an HTTP GET
pub struct HttpTokenProvider {
    url: String,
    client: Client,
}

impl HttpTokenProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| LiveSocketError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Extract the key from a token API response body
pub fn parse_token_response(body: &str) -> Result<String> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| LiveSocketError::TokenFetch(format!("unreadable response: {}", e)))?;

    if response.code != 0 {
        return Err(LiveSocketError::TokenFetch(format!(
            "API returned code {}: {}",
            response.code, response.message
        )));
    }

    response
        .data
        .and_then(|data| data.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| LiveSocketError::TokenFetch("response has no data.token".to_string()))
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching auth key");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LiveSocketError::TokenFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiveSocketError::TokenFetch(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LiveSocketError::TokenFetch(e.to_string()))?;

        parse_token_response(&body)
    }
}
