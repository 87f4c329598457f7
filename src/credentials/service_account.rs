//! Service-account credential for the Vertex AI backend.

use super::non_empty;
use crate::ai::vertex::{EndpointId, ServiceAccountIdentity};
use crate::settings::Settings;
use std::path::{Path, PathBuf};

/// Value shipped in the sample settings file; never a real project.
pub const PROJECT_ID_PLACEHOLDER: &str = "<your-project-id-here>";
/// Publisher model used when `[VERTEX_AI].MODEL` is not set.
pub const DEFAULT_IMAGEN_MODEL: &str = "imagen-3.0-generate-002";

#[derive(Debug, Clone)]
pub struct ServiceAccountCredential {
    project_id: String,
    location: String,
    key_file_path: PathBuf,
    identity: ServiceAccountIdentity,
    endpoint: EndpointId,
}

impl ServiceAccountCredential {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn key_file_path(&self) -> &Path {
        &self.key_file_path
    }

    pub fn identity(&self) -> &ServiceAccountIdentity {
        &self.identity
    }

    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }
}

pub(crate) fn resolve(settings: &Settings) -> Option<ServiceAccountCredential> {
    let section = &settings.vertex_ai;
    let (Some(project_id), Some(location), Some(key_file)) = (
        non_empty(section.project_id.as_deref()),
        non_empty(section.location.as_deref()),
        non_empty(section.service_account_file.as_deref()),
    ) else {
        tracing::warn!(
            "[VERTEX_AI] section missing or incomplete in settings. Imagen nodes will not work."
        );
        return None;
    };

    if project_id == PROJECT_ID_PLACEHOLDER {
        tracing::warn!("Vertex AI PROJECT_ID is not set in settings. Imagen nodes will not work.");
        return None;
    }

    let key_file_path = settings.resolve_path(key_file);
    if !key_file_path.exists() {
        tracing::warn!(
            "Vertex AI service account file not found at: {}",
            key_file_path.display()
        );
        return None;
    }

    let identity = match ServiceAccountIdentity::from_file(&key_file_path) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Error loading Vertex AI credentials: {}", e);
            return None;
        }
    };

    let model = non_empty(section.model.as_deref()).unwrap_or(DEFAULT_IMAGEN_MODEL);
    let endpoint = EndpointId::publisher_model(project_id, location, model);
    tracing::info!(
        "Vertex AI credentials loaded for {} ({})",
        identity.client_email(),
        endpoint
    );

    Some(ServiceAccountCredential {
        project_id: project_id.to_string(),
        location: location.to_string(),
        key_file_path,
        identity,
        endpoint,
    })
}
