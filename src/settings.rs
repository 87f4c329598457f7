//! Settings file handling
//!
//! Credentials live in a small TOML file with an `[API]` section for the
//! Gemini API key and a `[VERTEX_AI]` section for the service-account backend.
//! A missing or malformed file is not fatal: every field simply reads as
//! absent and the credential store degrades to unconfigured.

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that points at the settings file.
pub const CONFIG_PATH_ENV: &str = "GOOGLE_GENAI_NODES_CONFIG";
/// Settings file used when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    #[serde(rename = "GOOGLE_API_KEY")]
    pub google_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VertexAiSection {
    #[serde(rename = "PROJECT_ID")]
    pub project_id: Option<String>,
    #[serde(rename = "LOCATION")]
    pub location: Option<String>,
    #[serde(rename = "SERVICE_ACCOUNT_FILE")]
    pub service_account_file: Option<String>,
    #[serde(rename = "MODEL")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(rename = "API", default)]
    pub api: ApiSection,
    #[serde(rename = "VERTEX_AI", default)]
    pub vertex_ai: VertexAiSection,
    /// Directory relative paths in the file are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Settings {
    /// Parse settings from TOML text. `base_dir` anchors relative paths.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text)?;
        settings.base_dir = base_dir.to_path_buf();
        Ok(settings)
    }

    /// Load settings from `path`, falling back to empty settings on any error.
    pub fn load(path: &Path) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Settings file {} could not be read ({}); all credentials are unconfigured",
                    path.display(),
                    e
                );
                return Self::empty(&base_dir);
            }
        };

        match Self::from_toml_str(&text, &base_dir) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Settings file {} is malformed: {}", path.display(), e);
                Self::empty(&base_dir)
            }
        }
    }

    pub fn empty(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// Settings file location, honoring [`CONFIG_PATH_ENV`].
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}
