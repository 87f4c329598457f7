//! Backend response decoding
//!
//! Text responses are reduced to the concatenated text of the first
//! candidate. Image responses are decoded prediction by prediction; a
//! prediction that cannot be decoded is skipped so the rest still reach the
//! graph.

use crate::ai::gemini::{GenerateContentResponse, Part};
use crate::ai::vertex::PredictResponse;
use crate::image::codec::{decode_image_bytes, image_to_array};
use crate::image::mime::{accepts_image, resolve_mime};
use crate::image::ImageBatch;
use crate::{Error, Result};
use base64::Engine as _;

/// Prediction field carrying the base64-encoded image.
pub const IMAGE_BYTES_FIELD: &str = "bytesBase64Encoded";
const MIME_TYPE_FIELD: &str = "mimeType";

/// Text of the first candidate, or `EmptyResponse` when there is none.
pub fn decode_text(response: &GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
            .map(|reason| format!("prompt blocked ({})", reason))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::EmptyResponse(reason));
    };

    let texts: Vec<&str> = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if texts.is_empty() {
        return Err(Error::EmptyResponse(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(texts.concat())
}

fn decode_prediction(prediction: &serde_json::Value) -> Result<ndarray::Array3<f32>> {
    let encoded = prediction
        .get(IMAGE_BYTES_FIELD)
        .and_then(|value| value.as_str())
        .ok_or_else(|| Error::EmptyResponse(format!("prediction has no {}", IMAGE_BYTES_FIELD)))?;

    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    let declared = prediction.get(MIME_TYPE_FIELD).and_then(|value| value.as_str());
    let mime = resolve_mime(declared, &bytes);
    if !accepts_image(mime) {
        return Err(Error::Conversion(format!(
            "prediction payload is {}, not an image",
            mime
        )));
    }
    tracing::debug!("Decoding {} byte prediction ({})", bytes.len(), mime);

    let image = decode_image_bytes(&bytes)?;
    Ok(image_to_array(&image))
}

/// Decode every usable prediction into one batch, in response order.
pub fn decode_image_batch(response: &PredictResponse) -> Result<ImageBatch> {
    let mut images = Vec::with_capacity(response.predictions.len());

    for (idx, prediction) in response.predictions.iter().enumerate() {
        match decode_prediction(prediction) {
            Ok(image) => images.push(image),
            Err(e) => tracing::warn!("Skipping prediction {}: {}", idx, e),
        }
    }

    if images.is_empty() {
        return Err(Error::EmptyResponse(format!(
            "no decodable images in {} predictions",
            response.predictions.len()
        )));
    }

    if images.len() < response.predictions.len() {
        tracing::warn!(
            "Decoded {} of {} predictions",
            images.len(),
            response.predictions.len()
        );
    }

    ImageBatch::stack(&images)
}
