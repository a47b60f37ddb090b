//! Relay client for the upstream agent service.
//!
//! The agent itself is opaque to this crate: `run`, `setup`, and `approve`
//! are forwarded over HTTP and the JSON payloads that come back are passed
//! through verbatim. When OAuth2 client credentials are configured, a bearer
//! token is refreshed before upstream calls and attached to each request;
//! token handling never touches the stores.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::OauthConfig;
use crate::error::{Error, Result};
use crate::storage::ChatMessage;

/// Client for the upstream agent service.
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
    oauth: Option<OauthConfig>,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Whether the token needs refreshing before the next call.
    ///
    /// Refreshes a minute early so a token never expires mid-request.
    fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(60) >= self.expires_at
    }
}

/// Upstream request for the `run` call.
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    msg: &'a str,
    session_id: Option<&'a str>,
    history: &'a [ChatMessage],
}

/// Upstream request for the `setup` call.
#[derive(Debug, Serialize)]
struct SetupRequest<'a> {
    config: &'a serde_json::Value,
}

/// Token endpoint response for the client-credentials grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl AgentClient {
    /// Create a client for the agent at `base_url`.
    #[must_use]
    pub fn new(base_url: String, oauth: Option<OauthConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            oauth,
            token: Mutex::new(None),
        }
    }

    /// Relay one user message with its conversational context.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails or answers non-2xx.
    pub async fn run(
        &self,
        message: &str,
        session_id: Option<&str>,
        history: &[ChatMessage],
    ) -> Result<serde_json::Value> {
        let request = RunRequest {
            msg: message,
            session_id,
            history,
        };
        self.post("run", &request).await
    }

    /// Relay the setup-form config.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails or answers non-2xx.
    pub async fn setup(&self, config: &serde_json::Value) -> Result<serde_json::Value> {
        let request = SetupRequest { config };
        self.post("setup", &request).await
    }

    /// Relay an approval payload verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails or answers non-2xx.
    pub async fn approve(&self, payload: &serde_json::Value) -> Result<serde_json::Value> {
        self.post("approve", payload).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = self.bearer_token().await? {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Agent request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!("Agent error ({status}): {error}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("Failed to parse agent response: {e}")))
    }

    /// Get a bearer token for the next upstream call, refreshing if the
    /// cached one is missing or expired.
    ///
    /// Returns `None` when OAuth2 is not configured; calls then go out
    /// unauthenticated.
    async fn bearer_token(&self) -> Result<Option<String>> {
        let Some(oauth) = &self.oauth else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(Some(token.access_token.clone()));
            }
        }

        let refreshed = self.refresh_token(oauth).await?;
        let access_token = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(Some(access_token))
    }

    async fn refresh_token(&self, oauth: &OauthConfig) -> Result<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&oauth.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Token refresh failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "Token endpoint error ({status}): {error}"
            )));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("Failed to parse token response: {e}")))?;

        let ttl = data.expires_in.unwrap_or(3600);
        Ok(CachedToken {
            access_token: data.access_token,
            expires_at: Utc::now() + Duration::seconds(ttl),
        })
    }
}
