//! API-key credential for the Gemini backend.

use super::{non_empty, CredentialSources};

/// Environment variable consulted before the settings file.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Value shipped in the sample settings file; never a real key.
pub const API_KEY_PLACEHOLDER: &str = "<your_google_api_key_here>";

#[derive(Clone, PartialEq, Eq)]
pub struct KeyCredential {
    key: String,
}

impl KeyCredential {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for KeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCredential")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Environment first, then `[API].GOOGLE_API_KEY`.
///
/// A placeholder in either source makes the credential unconfigured, even
/// when the other source holds a usable key.
pub(crate) fn resolve(sources: &CredentialSources) -> Option<KeyCredential> {
    let env_key = non_empty(sources.env_api_key.as_deref());
    let file_key = non_empty(sources.settings.api.google_api_key.as_deref());

    let placeholder_origin = match (env_key, file_key) {
        (Some(API_KEY_PLACEHOLDER), _) => Some("environment variable GOOGLE_API_KEY"),
        (_, Some(API_KEY_PLACEHOLDER)) => Some("[API].GOOGLE_API_KEY"),
        _ => None,
    };
    if let Some(origin) = placeholder_origin {
        tracing::warn!(
            "Gemini API key from {} is still the placeholder. LLM/VLM nodes will not work.",
            origin
        );
        return None;
    }

    let (key, origin) = match (env_key, file_key) {
        (Some(key), _) => (key, "environment variable GOOGLE_API_KEY"),
        (None, Some(key)) => (key, "[API].GOOGLE_API_KEY"),
        (None, None) => {
            tracing::warn!(
                "GOOGLE_API_KEY not found in the environment or settings. LLM/VLM nodes will not work."
            );
            return None;
        }
    };

    tracing::debug!("Gemini API key resolved from {}", origin);
    Some(KeyCredential {
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::path::Path;

    fn sources(env: Option<&str>, file: Option<&str>) -> CredentialSources {
        let mut settings = Settings::empty(Path::new("."));
        settings.api.google_api_key = file.map(str::to_string);
        CredentialSources {
            settings,
            env_api_key: env.map(str::to_string),
        }
    }

    #[test]
    fn test_environment_takes_precedence() {
        let credential = resolve(&sources(Some("env-key"), Some("file-key"))).unwrap();
        assert_eq!(credential.key(), "env-key");
    }

    #[test]
    fn test_falls_back_to_settings() {
        let credential = resolve(&sources(None, Some("file-key"))).unwrap();
        assert_eq!(credential.key(), "file-key");
    }

    #[test]
    fn test_blank_environment_counts_as_absent() {
        let credential = resolve(&sources(Some("   "), Some("file-key"))).unwrap();
        assert_eq!(credential.key(), "file-key");
    }

    #[test]
    fn test_placeholder_is_unconfigured_from_either_source() {
        assert!(resolve(&sources(None, Some(API_KEY_PLACEHOLDER))).is_none());
        assert!(resolve(&sources(Some(API_KEY_PLACEHOLDER), Some("file-key"))).is_none());
        assert!(resolve(&sources(Some("env-key"), Some(API_KEY_PLACEHOLDER))).is_none());
    }

    #[test]
    fn test_missing_everywhere_is_unconfigured() {
        assert!(resolve(&sources(None, None)).is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let credential = resolve(&sources(Some("secret"), None)).unwrap();
        assert!(!format!("{:?}", credential).contains("secret"));
    }
}
