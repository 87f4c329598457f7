use super::{InputSpec, Node, NodeInputs, NodeOutput, NodeSpec, OutputKind};
use crate::ai::{BackendProvider, TextGenerationService};
use crate::failure::degrade_text;
use crate::request::{build_text_request, TextRequest};
use crate::response::decode_text;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub const LLM_NODE_ID: &str = "LLM_google";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";
pub const TEXT_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro"];

pub(crate) const PROMPT: &str = "prompt";
pub(crate) const MODEL: &str = "model";
pub(crate) const SYSTEM_PROMPT: &str = "system_prompt";

pub(crate) fn text_backend(
    backends: &dyn BackendProvider,
) -> Result<Arc<dyn TextGenerationService>> {
    backends.text_backend().ok_or_else(|| {
        Error::CredentialUnconfigured("Google API Key is not set or invalid.".to_string())
    })
}

/// Shared by the LLM and VLM nodes: one call, one decoded string.
pub(crate) async fn generate_text(
    service: &dyn TextGenerationService,
    model: &str,
    request: &TextRequest,
) -> Result<String> {
    let payload = request.to_generate_content()?;
    tracing::info!("Generating text with {}", model);
    let response = service.generate_content(model, &payload).await?;
    decode_text(&response)
}

/// Label used in the placeholder when the model input itself is unusable.
pub(crate) fn model_label(inputs: &NodeInputs) -> String {
    inputs
        .get_string(MODEL)
        .unwrap_or(DEFAULT_TEXT_MODEL)
        .to_string()
}

/// Prompt (plus optional system prompt) to text.
pub struct LlmNode {
    backends: Arc<dyn BackendProvider>,
}

impl LlmNode {
    pub fn new(backends: Arc<dyn BackendProvider>) -> Self {
        Self { backends }
    }

    pub fn node_spec() -> NodeSpec {
        NodeSpec {
            id: LLM_NODE_ID,
            display_name: "LLM (Google)",
            category: "GoogleAPI/LLM",
            inputs: vec![
                InputSpec::multiline(PROMPT),
                InputSpec::choice(MODEL, TEXT_MODELS, DEFAULT_TEXT_MODEL),
                InputSpec::multiline(SYSTEM_PROMPT),
            ],
            output: OutputKind::String,
        }
    }

    async fn generate(&self, inputs: &NodeInputs) -> Result<String> {
        let model = inputs.get_string(MODEL)?;
        let service = text_backend(self.backends.as_ref())?;
        let request = build_text_request(
            inputs.get_string(PROMPT)?,
            inputs.get_string(SYSTEM_PROMPT)?,
            None,
        )?;
        generate_text(service.as_ref(), model, &request).await
    }
}

#[async_trait]
impl Node for LlmNode {
    fn spec(&self) -> NodeSpec {
        Self::node_spec()
    }

    async fn run(&self, inputs: &NodeInputs) -> NodeOutput {
        let text = match self.generate(inputs).await {
            Ok(text) => text,
            Err(e) => degrade_text(&model_label(inputs), &e),
        };
        NodeOutput::Text(text)
    }
}
