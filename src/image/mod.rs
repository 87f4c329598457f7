//! Image tensor conversion
//!
//! The node graph hands images around as normalized floating-point tensors;
//! the remote services speak encoded PNG/JPEG bytes. This module bridges the
//! two through an 8-bit RGB intermediate that never leaves the crate boundary.

pub mod batch;
pub mod codec;
pub mod mime;

pub use batch::ImageBatch;
pub use codec::{decode_to_image, encode_from_image, ImageTensor, TensorLayout};

/// Single 8-bit RGB image, channel-last. Codec intermediate only.
pub type DecodedImage = image::RgbImage;
