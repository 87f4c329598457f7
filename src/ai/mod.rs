//! Remote generative-AI service seams
//!
//! Two backends sit behind two traits: Gemini `generateContent` (API key) for
//! text and vision, and Vertex AI `predict` (service account) for image
//! synthesis. Node adapters only ever see the traits, which keeps them
//! testable against the mocks in [`mock`].

pub mod gemini;
pub mod mock;
pub mod vertex;

pub use gemini::GeminiHttpClient;
pub use mock::{MockImageSynthesisClient, MockTextClient, StaticBackends};
pub use vertex::VertexPredictionClient;

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use gemini::{GenerateContentRequest, GenerateContentResponse};
use vertex::{EndpointId, PredictRequest, PredictResponse};

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[async_trait]
pub trait ImageSynthesisService: Send + Sync {
    async fn predict(
        &self,
        endpoint: &EndpointId,
        request: &PredictRequest,
    ) -> Result<PredictResponse>;
}

/// Hands node adapters a ready backend, or `None` when its credential is
/// unconfigured.
pub trait BackendProvider: Send + Sync {
    fn text_backend(&self) -> Option<Arc<dyn TextGenerationService>>;
    fn image_backend(&self) -> Option<(Arc<dyn ImageSynthesisService>, EndpointId)>;
}
