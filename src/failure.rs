//! Failure-to-placeholder translation
//!
//! The only place an [`Error`] turns into node output. Text paths get an
//! error string naming the model, image paths get one black frame, so the
//! graph always receives a value of the type it expects.

use crate::image::ImageBatch;
use crate::Error;

/// Fixed prefix of every degraded text result.
pub const TEXT_ERROR_MARKER: &str = "Error: Unable to generate text";
/// Edge length of the degraded image result.
pub const PLACEHOLDER_IMAGE_SIZE: u32 = 512;

pub fn degrade_text(model: &str, error: &Error) -> String {
    tracing::error!(
        kind = %error.kind(),
        "Text generation with {} failed: {}",
        model,
        error
    );
    format!("{} with {}.", TEXT_ERROR_MARKER, model)
}

pub fn degrade_image(model: &str, error: &Error) -> ImageBatch {
    tracing::error!(
        kind = %error.kind(),
        "Image generation with {} failed: {}",
        model,
        error
    );
    ImageBatch::solid(PLACEHOLDER_IMAGE_SIZE, PLACEHOLDER_IMAGE_SIZE, [0.0; 3])
}
