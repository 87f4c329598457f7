use super::gemini::{Content, GenerateContentRequest, GenerateContentResponse, Part};
use super::vertex::{EndpointId, PredictRequest, PredictResponse};
use super::{BackendProvider, ImageSynthesisService, TextGenerationService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory text backend that cycles through canned replies.
pub struct MockTextClient {
    responses: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<(String, GenerateContentRequest)>>>,
}

impl MockTextClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_text_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Every call fails with a remote-call error carrying `message`.
    pub fn with_failure(self, message: String) -> Self {
        *self.failure.lock().unwrap() = Some(message);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Model and payload of every call so far, in order.
    pub fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTextClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerationService for MockTextClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let mut requests = self.requests.lock().unwrap();
        requests.push((model.to_string(), request.clone()));

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::RemoteCall(message));
        }

        let responses = self.responses.lock().unwrap();
        let text = if responses.is_empty() {
            format!("Mock response from {}", model)
        } else {
            responses[(requests.len() - 1) % responses.len()].clone()
        };

        Ok(GenerateContentResponse {
            candidates: vec![super::gemini::types::Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::Text { text }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        })
    }
}

/// In-memory image backend returning a fixed prediction list.
pub struct MockImageSynthesisClient {
    predictions: Arc<Mutex<Vec<serde_json::Value>>>,
    failure: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<(EndpointId, PredictRequest)>>>,
}

impl MockImageSynthesisClient {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_prediction(self, prediction: serde_json::Value) -> Self {
        self.predictions.lock().unwrap().push(prediction);
        self
    }

    /// Adds a prediction carrying `image_bytes` as base64.
    pub fn with_image_bytes(self, image_bytes: &[u8]) -> Self {
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        self.with_prediction(serde_json::json!({
            "bytesBase64Encoded": encoded,
            "mimeType": "image/png",
        }))
    }

    pub fn with_failure(self, message: String) -> Self {
        *self.failure.lock().unwrap() = Some(message);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(EndpointId, PredictRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageSynthesisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSynthesisService for MockImageSynthesisClient {
    async fn predict(
        &self,
        endpoint: &EndpointId,
        request: &PredictRequest,
    ) -> Result<PredictResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.clone(), request.clone()));

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::RemoteCall(message));
        }

        Ok(PredictResponse {
            predictions: self.predictions.lock().unwrap().clone(),
            deployed_model_id: None,
        })
    }
}

/// Fixed backends for driving node adapters without credentials.
#[derive(Default, Clone)]
pub struct StaticBackends {
    text: Option<Arc<dyn TextGenerationService>>,
    image: Option<(Arc<dyn ImageSynthesisService>, EndpointId)>,
}

impl StaticBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, service: Arc<dyn TextGenerationService>) -> Self {
        self.text = Some(service);
        self
    }

    pub fn with_image(mut self, service: Arc<dyn ImageSynthesisService>, endpoint: EndpointId) -> Self {
        self.image = Some((service, endpoint));
        self
    }
}

impl BackendProvider for StaticBackends {
    fn text_backend(&self) -> Option<Arc<dyn TextGenerationService>> {
        self.text.clone()
    }

    fn image_backend(&self) -> Option<(Arc<dyn ImageSynthesisService>, EndpointId)> {
        self.image.clone()
    }
}
