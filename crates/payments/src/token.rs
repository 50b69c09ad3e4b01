//! Provider access tokens.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};

/// Tokens are refreshed this long before the provider says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for provider API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// OAuth2 client-credentials exchange against `{base_url}/v1/oauth2/token`.
///
/// The token is cached until shortly before it expires. Concurrent callers
/// wait for a single in-flight exchange instead of each starting one.
pub struct ClientCredentialsTokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsTokenProvider {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/v1/oauth2/token", base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "access token request rejected");
            return Err(PaymentError::ExternalService(format!(
                "access token request failed with status {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AccessTokenProvider for ClientCredentialsTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.token.clone());
        }

        let response = self.exchange().await?;
        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(0));
        tracing::debug!(expires_in = lifetime.as_secs(), "fetched provider access token");

        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });
        Ok(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_token_url_is_normalized() {
        let provider = ClientCredentialsTokenProvider::new(
            reqwest::Client::new(),
            "https://api-m.sandbox.paypal.com/",
            "id",
            "secret",
        );
        assert_eq!(
            provider.token_url,
            "https://api-m.sandbox.paypal.com/v1/oauth2/token"
        );
    }
}
