//! Backend-specific request construction
//!
//! Text and vision calls go to Gemini as a single user turn whose parts are
//! the prompt followed by the optional image. Image synthesis goes to Vertex
//! AI as a flat instance/parameters pair. Neither payload carries the other's
//! fields.

use crate::ai::gemini::{Content, GenerateContentRequest, InlineData, Part};
use crate::ai::vertex::{PredictRequest, SynthesisInstance, SynthesisParameters};
use crate::image::codec::encode_png;
use crate::image::{decode_to_image, DecodedImage, ImageTensor};
use crate::{Error, Result};

pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 1536;
pub const DIMENSION_STEP: u32 = 64;
pub const DEFAULT_DIMENSION: u32 = 1024;
pub const MAX_IMAGE_COUNT: u32 = 4;
pub const MAX_SEED: u64 = 9_999_999_999;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub image: Option<DecodedImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSynthesisRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub count: u32,
    pub seed: u64,
}

/// Build a text (or vision) request. An empty system prompt means none.
pub fn build_text_request(
    prompt: &str,
    system_prompt: &str,
    image: Option<&ImageTensor>,
) -> Result<TextRequest> {
    let image = image.map(decode_to_image).transpose()?;
    let system_prompt = Some(system_prompt)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Ok(TextRequest {
        prompt: prompt.to_string(),
        system_prompt,
        image,
    })
}

fn check_dimension(name: &str, value: u32) -> Result<()> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) || value % DIMENSION_STEP != 0 {
        return Err(Error::Conversion(format!(
            "{} must be a multiple of {} in {}..={}, got {}",
            name, DIMENSION_STEP, MIN_DIMENSION, MAX_DIMENSION, value
        )));
    }
    Ok(())
}

/// Build a synthesis request, rejecting (never clamping) out-of-range values.
pub fn build_image_synthesis_request(
    prompt: &str,
    negative_prompt: &str,
    width: u32,
    height: u32,
    count: u32,
    seed: u64,
) -> Result<ImageSynthesisRequest> {
    check_dimension("width", width)?;
    check_dimension("height", height)?;
    if !(1..=MAX_IMAGE_COUNT).contains(&count) {
        return Err(Error::Conversion(format!(
            "image count must be in 1..={}, got {}",
            MAX_IMAGE_COUNT, count
        )));
    }
    if seed > MAX_SEED {
        return Err(Error::Conversion(format!(
            "seed must be at most {}, got {}",
            MAX_SEED, seed
        )));
    }

    Ok(ImageSynthesisRequest {
        prompt: prompt.to_string(),
        negative_prompt: negative_prompt.to_string(),
        width,
        height,
        count,
        seed,
    })
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Reduced `W:H` ratio, e.g. `1024x576` -> `16:9`.
pub fn aspect_ratio(width: u32, height: u32) -> String {
    let divisor = gcd(width, height).max(1);
    format!("{}:{}", width / divisor, height / divisor)
}

impl TextRequest {
    /// Gemini payload: prompt text, then the image as inline PNG.
    pub fn to_generate_content(&self) -> Result<GenerateContentRequest> {
        let mut parts = vec![Part::Text {
            text: self.prompt.clone(),
        }];

        if let Some(image) = &self.image {
            use base64::Engine as _;
            let png = encode_png(image)?;
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png".to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(png),
                },
            });
        }

        Ok(GenerateContentRequest {
            system_instruction: self.system_prompt.clone().map(Content::system),
            contents: vec![Content::user(parts)],
        })
    }
}

impl ImageSynthesisRequest {
    /// Vertex AI payload.
    ///
    /// Pixel width/height and the reduced aspect ratio are both sent; models
    /// that size by ratio ignore the pixel fields and vice versa.
    pub fn to_predict_request(&self) -> PredictRequest {
        PredictRequest {
            instances: vec![SynthesisInstance {
                prompt: self.prompt.clone(),
                negative_prompt: self.negative_prompt.clone(),
            }],
            parameters: SynthesisParameters {
                sample_count: self.count,
                aspect_ratio: aspect_ratio(self.width, self.height),
                seed: self.seed,
                width: self.width,
                height: self.height,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_request_without_image_or_system_prompt() {
        let request = build_text_request("hello", "", None).unwrap();
        assert_eq!(request.system_prompt, None);
        assert!(request.image.is_none());

        let payload = serde_json::to_value(request.to_generate_content().unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })
        );
    }

    #[test]
    fn test_empty_prompt_is_allowed() {
        let request = build_text_request("", "be brief", None).unwrap();
        assert_eq!(request.prompt, "");
        assert_eq!(request.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_text_request_with_image_appends_inline_png() {
        let tensor = ImageTensor::from(Array4::<f32>::from_elem((1, 4, 4, 3), 0.5));
        let request = build_text_request("what is this?", "be brief", Some(&tensor)).unwrap();
        assert_eq!(request.image.as_ref().unwrap().dimensions(), (4, 4));

        let payload = request.to_generate_content().unwrap();
        assert_eq!(
            payload.system_instruction,
            Some(Content::system("be brief".to_string()))
        );
        let parts = &payload.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Part::Text { text } if text == "what is this?"));
        match &parts[1] {
            Part::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/png");
                use base64::Engine as _;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&inline_data.data)
                    .unwrap();
                assert_eq!(bytes[..4], [0x89, 0x50, 0x4E, 0x47]);
            }
            other => panic!("expected inline data, got {:?}", other),
        }
    }

    #[test]
    fn test_text_request_rejects_unrecognized_image_shape() {
        let tensor = ImageTensor::Float(ndarray::ArrayD::zeros(ndarray::IxDyn(&[2, 2, 2, 2, 2])));
        let err = build_text_request("x", "", Some(&tensor)).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_synthesis_payload_shape() {
        let request = build_image_synthesis_request("a cat", "", 1024, 1024, 2, 42).unwrap();
        let payload = serde_json::to_value(request.to_predict_request()).unwrap();

        assert_eq!(
            payload,
            serde_json::json!({
                "instances": [{ "prompt": "a cat", "negative_prompt": "" }],
                "parameters": {
                    "sampleCount": 2,
                    "aspectRatio": "1:1",
                    "seed": 42,
                    "width": 1024,
                    "height": 1024
                }
            })
        );
    }

    #[test]
    fn test_text_payload_never_carries_synthesis_fields() {
        let request = build_text_request("a cat", "", None).unwrap();
        let json = serde_json::to_string(&request.to_generate_content().unwrap()).unwrap();
        for field in ["negative_prompt", "sampleCount", "seed", "instances"] {
            assert!(!json.contains(field), "{} leaked into {}", field, json);
        }
    }

    #[test]
    fn test_synthesis_bounds_are_enforced() {
        assert!(build_image_synthesis_request("p", "", 1000, 1024, 1, 0).is_err());
        assert!(build_image_synthesis_request("p", "", 192, 1024, 1, 0).is_err());
        assert!(build_image_synthesis_request("p", "", 1024, 1600, 1, 0).is_err());
        assert!(build_image_synthesis_request("p", "", 1024, 1024, 0, 0).is_err());
        assert!(build_image_synthesis_request("p", "", 1024, 1024, 5, 0).is_err());
        assert!(build_image_synthesis_request("p", "", 1024, 1024, 1, MAX_SEED + 1).is_err());

        assert!(build_image_synthesis_request("p", "", 256, 1536, 4, MAX_SEED).is_ok());
    }

    #[test]
    fn test_aspect_ratio_is_reduced() {
        assert_eq!(aspect_ratio(1024, 576), "16:9");
        assert_eq!(aspect_ratio(768, 1024), "3:4");
        assert_eq!(aspect_ratio(1536, 1536), "1:1");
    }
}
