//! Service-account identity for the Vertex AI backend.
//!
//! A Google service-account key file carries an RSA private key. Access
//! tokens are obtained by signing a short-lived RS256 JWT assertion with that
//! key and exchanging it at the key file's token endpoint.

use crate::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKeyFile {
    #[serde(rename = "type")]
    account_type: Option<String>,
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Identity material loaded from a service-account key file.
#[derive(Clone)]
pub struct ServiceAccountIdentity {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for ServiceAccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountIdentity")
            .field("client_email", &self.client_email)
            .field("key_id", &self.key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountIdentity {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let key: ServiceAccountKeyFile = serde_json::from_str(text).map_err(|e| {
            Error::CredentialUnconfigured(format!("Service account key file is invalid: {}", e))
        })?;

        if let Some(account_type) = key.account_type.as_deref() {
            if account_type != "service_account" {
                return Err(Error::CredentialUnconfigured(format!(
                    "Key file type is '{}', expected 'service_account'",
                    account_type
                )));
            }
        }

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri: key.token_uri,
            encoding_key,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Signed JWT assertion valid for one hour from `issued_at`.
    pub fn assertion(&self, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + TimeDelta::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }
}
