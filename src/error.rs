//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. Every
//! variant maps onto one of four failure kinds, which is all the node layer
//! cares about when it substitutes placeholder output.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential not configured: {0}")]
    CredentialUnconfigured(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Remote call error: {0}")]
    RemoteCall(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Settings parse error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Coarse classification used for logging and placeholder routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CredentialUnconfigured,
    Conversion,
    EmptyResponse,
    RemoteCall,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::CredentialUnconfigured => "credential-unconfigured",
            FailureKind::Conversion => "conversion",
            FailureKind::EmptyResponse => "empty-response",
            FailureKind::RemoteCall => "remote-call",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::CredentialUnconfigured(_) | Error::Settings(_) | Error::Jwt(_) => {
                FailureKind::CredentialUnconfigured
            }
            Error::Conversion(_) | Error::Image(_) | Error::Base64(_) => FailureKind::Conversion,
            Error::EmptyResponse(_) => FailureKind::EmptyResponse,
            Error::RemoteCall(_) | Error::Http(_) | Error::Serialization(_) | Error::Io(_) => {
                FailureKind::RemoteCall
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_variants_keep_their_kind() {
        assert_eq!(
            Error::CredentialUnconfigured("x".into()).kind(),
            FailureKind::CredentialUnconfigured
        );
        assert_eq!(Error::Conversion("x".into()).kind(), FailureKind::Conversion);
        assert_eq!(
            Error::EmptyResponse("x".into()).kind(),
            FailureKind::EmptyResponse
        );
        assert_eq!(Error::RemoteCall("x".into()).kind(), FailureKind::RemoteCall);
    }

    #[test]
    fn test_wrapped_errors_are_classified() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(json_err).kind(), FailureKind::RemoteCall);

        use base64::Engine as _;
        let b64_err = base64::engine::general_purpose::STANDARD
            .decode("!!!")
            .unwrap_err();
        assert_eq!(Error::from(b64_err).kind(), FailureKind::Conversion);
    }
}
