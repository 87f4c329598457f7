use super::auth::ServiceAccountIdentity;
use super::types::{EndpointId, PredictRequest, PredictResponse};
use crate::ai::ImageSynthesisService;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Tokens are refreshed this long before they actually expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
    }
}

/// Vertex AI prediction client bound to one regional API host.
pub struct VertexPredictionClient {
    client: Client,
    identity: ServiceAccountIdentity,
    base_url: String,
    timeout: Duration,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for VertexPredictionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexPredictionClient")
            .field("identity", &self.identity)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `https://{location}-aiplatform.googleapis.com`
pub fn regional_base_url(location: &str) -> String {
    format!("https://{}-aiplatform.googleapis.com", location)
}

impl VertexPredictionClient {
    pub fn new(identity: ServiceAccountIdentity, location: &str) -> Self {
        Self::new_with_client(identity, location, Client::new())
    }

    pub fn new_with_client(identity: ServiceAccountIdentity, location: &str, client: Client) -> Self {
        Self {
            client,
            identity,
            base_url: regional_base_url(location),
            timeout: DEFAULT_TIMEOUT,
            token: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cached bearer token, exchanged for a new one only near expiry.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.exchange_assertion(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        tracing::debug!(
            "Requesting access token for {}",
            self.identity.client_email()
        );
        let assertion = self.identity.assertion(now)?;

        let response = self
            .client
            .post(self.identity.token_uri())
            .timeout(self.timeout)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach token endpoint: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Token exchange failed (status {}): {}", status, error_text);
            return Err(Error::RemoteCall(format!(
                "Token exchange failed (status {}): {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + TimeDelta::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl ImageSynthesisService for VertexPredictionClient {
    async fn predict(
        &self,
        endpoint: &EndpointId,
        request: &PredictRequest,
    ) -> Result<PredictResponse> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/{}:predict", self.base_url, endpoint);
        tracing::debug!("Sending predict request to {}", endpoint);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Vertex AI: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Vertex AI error (status {}): {}", status, error_text);
            return Err(Error::RemoteCall(format!(
                "Vertex AI error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Vertex AI response: {}\nBody: {}", e, body);
            Error::RemoteCall(format!("Failed to parse Vertex AI response: {}", e))
        })
    }
}
