//! Lazy, cached credential resolution
//!
//! Each credential kind is resolved at most once per store, on first use,
//! and the outcome (including "unconfigured") is kept for the life of the
//! process. Node invocations can therefore ask for clients on every call
//! without touching the settings file or re-reading key files.
//!
//! Client configuration uses double-checked locking: a lock-free flag check
//! on the hot path, then the mutex, then a re-check before configuring.

pub mod key;
pub mod service_account;

pub use key::{KeyCredential, API_KEY_PLACEHOLDER, GOOGLE_API_KEY_ENV};
pub use service_account::{ServiceAccountCredential, DEFAULT_IMAGEN_MODEL, PROJECT_ID_PLACEHOLDER};

use crate::ai::vertex::EndpointId;
use crate::ai::{
    BackendProvider, GeminiHttpClient, ImageSynthesisService, TextGenerationService,
    VertexPredictionClient,
};
use crate::settings::Settings;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Everything credential resolution reads: the settings file and the one
/// environment variable that can override it.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub settings: Settings,
    pub env_api_key: Option<String>,
}

impl CredentialSources {
    /// Read the settings file at `config_path` and the process environment.
    pub fn from_environment(config_path: &Path) -> Self {
        Self {
            settings: Settings::load(config_path),
            env_api_key: std::env::var(GOOGLE_API_KEY_ENV).ok(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CredentialStore {
    sources: CredentialSources,
    key: OnceLock<Option<KeyCredential>>,
    service_account: OnceLock<Option<ServiceAccountCredential>>,
    key_client_configured: AtomicBool,
    key_client_lock: Mutex<()>,
    key_client: OnceLock<Arc<GeminiHttpClient>>,
    key_client_configurations: AtomicUsize,
    vertex_client: OnceLock<Arc<VertexPredictionClient>>,
    gemini_base_url: Option<String>,
    vertex_base_url: Option<String>,
}

impl CredentialStore {
    pub fn new(sources: CredentialSources) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    /// Point the Gemini client at a different host (proxies, tests).
    pub fn with_gemini_base_url(mut self, base_url: String) -> Self {
        self.gemini_base_url = Some(base_url);
        self
    }

    /// Point the Vertex AI client at a different host (proxies, tests).
    pub fn with_vertex_base_url(mut self, base_url: String) -> Self {
        self.vertex_base_url = Some(base_url);
        self
    }

    pub fn resolve_key_credential(&self) -> Option<&KeyCredential> {
        self.key.get_or_init(|| key::resolve(&self.sources)).as_ref()
    }

    pub fn resolve_service_account_credential(&self) -> Option<&ServiceAccountCredential> {
        self.service_account
            .get_or_init(|| service_account::resolve(&self.sources.settings))
            .as_ref()
    }

    /// Configure the API-key client once; later calls return the cached
    /// readiness without configuring again.
    pub fn configure_key_client(&self) -> bool {
        if self.key_client_configured.load(Ordering::Acquire) {
            return self.key_client.get().is_some();
        }

        let _guard = self
            .key_client_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.key_client_configured.load(Ordering::Acquire) {
            return self.key_client.get().is_some();
        }

        self.key_client_configurations
            .fetch_add(1, Ordering::Relaxed);
        let ready = match self.resolve_key_credential() {
            Some(credential) => {
                let mut client = GeminiHttpClient::new(credential.key().to_string());
                if let Some(base_url) = &self.gemini_base_url {
                    client = client.with_base_url(base_url.clone());
                }
                let _ = self.key_client.set(Arc::new(client));
                tracing::info!("Google Gemini (API key) client configured successfully.");
                true
            }
            None => false,
        };

        self.key_client_configured.store(true, Ordering::Release);
        ready
    }

    /// How many times the API-key client was actually configured (0 or 1).
    pub fn key_client_configurations(&self) -> usize {
        self.key_client_configurations.load(Ordering::Relaxed)
    }

    pub fn key_client(&self) -> Option<Arc<GeminiHttpClient>> {
        if !self.configure_key_client() {
            return None;
        }
        self.key_client.get().cloned()
    }

    /// Client and publisher endpoint for the service-account backend, or
    /// `None` when that credential is unconfigured.
    pub fn get_service_account_client_and_endpoint(
        &self,
    ) -> Option<(Arc<VertexPredictionClient>, EndpointId)> {
        let Some(credential) = self.resolve_service_account_credential() else {
            tracing::debug!("Vertex AI client requested while unconfigured");
            return None;
        };

        let client = self.vertex_client.get_or_init(|| {
            let mut client =
                VertexPredictionClient::new(credential.identity().clone(), credential.location());
            if let Some(base_url) = &self.vertex_base_url {
                client = client.with_base_url(base_url.clone());
            }
            tracing::debug!("Vertex AI client bound to {}", client.base_url());
            Arc::new(client)
        });

        Some((client.clone(), credential.endpoint().clone()))
    }
}

impl BackendProvider for CredentialStore {
    fn text_backend(&self) -> Option<Arc<dyn TextGenerationService>> {
        self.key_client()
            .map(|client| client as Arc<dyn TextGenerationService>)
    }

    fn image_backend(&self) -> Option<(Arc<dyn ImageSynthesisService>, EndpointId)> {
        self.get_service_account_client_and_endpoint()
            .map(|(client, endpoint)| (client as Arc<dyn ImageSynthesisService>, endpoint))
    }
}

static GLOBAL_STORE: OnceLock<Arc<CredentialStore>> = OnceLock::new();

/// Install the process-wide store. The first call wins; later calls log and
/// return the existing store.
pub fn init_global(sources: CredentialSources) -> Arc<CredentialStore> {
    let mut installed = false;
    let store = GLOBAL_STORE
        .get_or_init(|| {
            installed = true;
            Arc::new(CredentialStore::new(sources))
        })
        .clone();
    if !installed {
        tracing::warn!("Credential store already initialized; ignoring new sources");
    }
    store
}

/// Process-wide store, created from the default settings path on first use.
pub fn global() -> Arc<CredentialStore> {
    GLOBAL_STORE
        .get_or_init(|| {
            Arc::new(CredentialStore::new(CredentialSources::from_environment(
                &Settings::default_path(),
            )))
        })
        .clone()
}
