//! Vertex AI `predict` payload types for image synthesis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully qualified publisher model path used by `predict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn publisher_model(project_id: &str, location: &str, model: &str) -> Self {
        Self(format!(
            "projects/{}/locations/{}/publishers/google/models/{}",
            project_id, location, model
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<SynthesisInstance>,
    pub parameters: SynthesisParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisInstance {
    pub prompt: String,
    pub negative_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
}

/// Predictions are kept loosely typed; each may or may not carry an image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<serde_json::Value>,
    pub deployed_model_id: Option<String>,
}
