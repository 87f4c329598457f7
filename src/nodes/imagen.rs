use super::{InputSpec, Node, NodeInputs, NodeOutput, NodeSpec, OutputKind};
use crate::ai::BackendProvider;
use crate::failure::degrade_image;
use crate::image::ImageBatch;
use crate::request::{
    build_image_synthesis_request, DEFAULT_DIMENSION, DIMENSION_STEP, MAX_DIMENSION,
    MAX_IMAGE_COUNT, MAX_SEED, MIN_DIMENSION,
};
use crate::response::decode_image_batch;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub const IMAGEN_NODE_ID: &str = "Imagen_google";
/// Model label used in logs and placeholders.
pub const IMAGEN_LABEL: &str = "Imagen";

const PROMPT: &str = "prompt";
const NEGATIVE_PROMPT: &str = "negative_prompt";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const NUM_IMAGES: &str = "num_images";
const SEED: &str = "seed";

fn int_input<T: TryFrom<i64>>(inputs: &NodeInputs, name: &str) -> Result<T> {
    let value = inputs.get_int(name)?;
    T::try_from(value)
        .map_err(|_| Error::Conversion(format!("input '{}' out of range: {}", name, value)))
}

/// Text to a batch of images via Vertex AI.
pub struct ImagenNode {
    backends: Arc<dyn BackendProvider>,
}

impl ImagenNode {
    pub fn new(backends: Arc<dyn BackendProvider>) -> Self {
        Self { backends }
    }

    pub fn node_spec() -> NodeSpec {
        let dimension = |name: &'static str| {
            InputSpec::int(
                name,
                i64::from(DEFAULT_DIMENSION),
                i64::from(MIN_DIMENSION),
                i64::from(MAX_DIMENSION),
                i64::from(DIMENSION_STEP),
            )
        };

        NodeSpec {
            id: IMAGEN_NODE_ID,
            display_name: "Imagen Text-to-Image (Google)",
            category: "GoogleAPI/Image",
            inputs: vec![
                InputSpec::multiline(PROMPT),
                InputSpec::multiline(NEGATIVE_PROMPT),
                dimension(WIDTH),
                dimension(HEIGHT),
                InputSpec::int(NUM_IMAGES, 1, 1, i64::from(MAX_IMAGE_COUNT), 1),
                InputSpec::int(SEED, 0, 0, MAX_SEED as i64, 1),
            ],
            output: OutputKind::Image,
        }
    }

    async fn generate(&self, inputs: &NodeInputs) -> Result<ImageBatch> {
        let (service, endpoint) = self.backends.image_backend().ok_or_else(|| {
            Error::CredentialUnconfigured(
                "Vertex AI client not configured. Check the settings file and key file."
                    .to_string(),
            )
        })?;

        let request = build_image_synthesis_request(
            inputs.get_string(PROMPT)?,
            inputs.get_string(NEGATIVE_PROMPT)?,
            int_input(inputs, WIDTH)?,
            int_input(inputs, HEIGHT)?,
            int_input(inputs, NUM_IMAGES)?,
            int_input(inputs, SEED)?,
        )?;

        tracing::info!(
            "Requesting {} image(s) at {}x{} from {}",
            request.count,
            request.width,
            request.height,
            endpoint
        );
        let response = service
            .predict(&endpoint, &request.to_predict_request())
            .await?;
        decode_image_batch(&response)
    }
}

#[async_trait]
impl Node for ImagenNode {
    fn spec(&self) -> NodeSpec {
        Self::node_spec()
    }

    async fn run(&self, inputs: &NodeInputs) -> NodeOutput {
        let batch = match self.generate(inputs).await {
            Ok(batch) => batch,
            Err(e) => degrade_image(IMAGEN_LABEL, &e),
        };
        NodeOutput::Image(batch)
    }
}
