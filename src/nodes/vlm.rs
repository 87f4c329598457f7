use super::llm::{generate_text, model_label, text_backend, MODEL, PROMPT, SYSTEM_PROMPT};
use super::{InputSpec, Node, NodeInputs, NodeOutput, NodeSpec, OutputKind};
use crate::ai::BackendProvider;
use crate::failure::degrade_text;
use crate::request::build_text_request;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub const VLM_NODE_ID: &str = "VLM_google";
pub const VISION_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro-vision"];

pub(crate) const IMAGE: &str = "image";

/// Prompt plus one image to text.
pub struct VlmNode {
    backends: Arc<dyn BackendProvider>,
}

impl VlmNode {
    pub fn new(backends: Arc<dyn BackendProvider>) -> Self {
        Self { backends }
    }

    pub fn node_spec() -> NodeSpec {
        NodeSpec {
            id: VLM_NODE_ID,
            display_name: "VLM (Google)",
            category: "GoogleAPI/VLM",
            inputs: vec![
                InputSpec::multiline(PROMPT),
                InputSpec::choice(MODEL, VISION_MODELS, super::llm::DEFAULT_TEXT_MODEL),
                InputSpec::multiline(SYSTEM_PROMPT),
                InputSpec::image(IMAGE),
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
            Some(inputs.get_image(IMAGE)?),
        )?;
        generate_text(service.as_ref(), model, &request).await
    }
}

#[async_trait]
impl Node for VlmNode {
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
