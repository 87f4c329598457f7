//! Shape dispatch between graph tensors and decoded RGB images.

use super::{DecodedImage, ImageBatch};
use crate::{Error, Result};
use ndarray::{Array3, Array4, ArrayD, ArrayView3, Axis, Ix2, Ix3};
use std::io::Cursor;

/// Graph-native image input: any recognized layout, float or byte samples.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageTensor {
    /// Samples in `[0.0, 1.0]`.
    Float(ArrayD<f32>),
    /// Samples already in `[0, 255]`.
    Byte(ArrayD<u8>),
}

impl ImageTensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            ImageTensor::Float(data) => data.shape(),
            ImageTensor::Byte(data) => data.shape(),
        }
    }
}

impl From<ImageBatch> for ImageTensor {
    fn from(batch: ImageBatch) -> Self {
        ImageTensor::Float(batch.into_array().into_dyn())
    }
}

impl From<Array4<f32>> for ImageTensor {
    fn from(data: Array4<f32>) -> Self {
        ImageTensor::Float(data.into_dyn())
    }
}

/// Closed set of tensor shapes the codec accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `(1, ...)`: a batch holding exactly one image; the rest is re-dispatched
    /// with trailing channels preferred.
    SingleBatch,
    /// `(3, H, W)`
    ChannelFirst,
    /// `(H, W, 3)`
    ChannelLast,
    /// `(H, W, 1)`
    GrayscaleChannel,
    /// `(H, W)`
    Grayscale,
}

impl TensorLayout {
    /// Classify a tensor shape. Channel-first wins when a bare 3D shape is
    /// ambiguous.
    pub fn classify(shape: &[usize]) -> Result<Self> {
        if shape.contains(&0) {
            return Err(Error::Conversion(format!(
                "Image tensor has an empty dimension: {:?}",
                shape
            )));
        }

        match *shape {
            [1, _, _, _] => Ok(TensorLayout::SingleBatch),
            [3, _, _] => Ok(TensorLayout::ChannelFirst),
            [_, _, 3] => Ok(TensorLayout::ChannelLast),
            [_, _, 1] => Ok(TensorLayout::GrayscaleChannel),
            [_, _] => Ok(TensorLayout::Grayscale),
            _ => Err(Error::Conversion(format!(
                "Unrecognized image tensor shape {:?}",
                shape
            ))),
        }
    }

    /// Classify the image inside a single-image batch. Graph batches are
    /// `(N, H, W, C)`, so a trailing channel axis wins over channel-first.
    pub fn classify_batch_element(shape: &[usize]) -> Result<Self> {
        match *shape {
            [_, _, 3] if !shape.contains(&0) => Ok(TensorLayout::ChannelLast),
            [_, _, 1] if !shape.contains(&0) => Ok(TensorLayout::GrayscaleChannel),
            _ => Self::classify(shape),
        }
    }
}

/// Scale a normalized sample to 8 bits, clamping out-of-range input.
pub fn float_to_byte(sample: f32) -> u8 {
    (sample.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn byte_to_float(sample: u8) -> f32 {
    f32::from(sample) / 255.0
}

fn shape_error(e: ndarray::ShapeError) -> Error {
    Error::Conversion(format!("Image tensor reshape failed: {}", e))
}

/// Reduce any recognized layout to `(H, W, 3)`.
fn to_channel_last(pixels: ArrayD<u8>) -> Result<Array3<u8>> {
    match TensorLayout::classify(pixels.shape())? {
        TensorLayout::SingleBatch => {
            let image = pixels.index_axis_move(Axis(0), 0);
            let layout = TensorLayout::classify_batch_element(image.shape())?;
            reshape_layout(image, layout)
        }
        layout => reshape_layout(pixels, layout),
    }
}

fn reshape_layout(pixels: ArrayD<u8>, layout: TensorLayout) -> Result<Array3<u8>> {
    match layout {
        TensorLayout::SingleBatch => to_channel_last(pixels),
        TensorLayout::ChannelFirst => Ok(pixels
            .into_dimensionality::<Ix3>()
            .map_err(shape_error)?
            .permuted_axes([1, 2, 0])),
        TensorLayout::ChannelLast => pixels.into_dimensionality::<Ix3>().map_err(shape_error),
        TensorLayout::GrayscaleChannel => {
            let gray = pixels.into_dimensionality::<Ix3>().map_err(shape_error)?;
            let (height, width, _) = gray.dim();
            broadcast_rgb(gray, height, width)
        }
        TensorLayout::Grayscale => {
            let gray = pixels.into_dimensionality::<Ix2>().map_err(shape_error)?;
            let (height, width) = gray.dim();
            broadcast_rgb(gray.insert_axis(Axis(2)), height, width)
        }
    }
}

fn broadcast_rgb(gray: Array3<u8>, height: usize, width: usize) -> Result<Array3<u8>> {
    let rgb = gray.broadcast((height, width, 3)).map(|view| view.to_owned());
    rgb.ok_or_else(|| Error::Conversion("Grayscale tensor could not be broadcast".to_string()))
}

/// Convert a graph tensor into a single 8-bit RGB image.
pub fn decode_to_image(tensor: &ImageTensor) -> Result<DecodedImage> {
    let pixels = match tensor {
        ImageTensor::Float(data) => data.mapv(float_to_byte),
        ImageTensor::Byte(data) => data.clone(),
    };
    let rgb = to_channel_last(pixels)?;
    rgb_to_image(rgb.iter().copied(), rgb.dim())
}

/// Convert one batch element, already known to be `(H, W, 3)`.
pub(crate) fn array_to_image(image: ArrayView3<'_, f32>) -> Result<DecodedImage> {
    rgb_to_image(image.iter().map(|&v| float_to_byte(v)), image.dim())
}

// iter() walks logical order, so permuted views still come out row-major.
fn rgb_to_image(
    samples: impl Iterator<Item = u8>,
    (height, width, _): (usize, usize, usize),
) -> Result<DecodedImage> {
    DecodedImage::from_raw(width as u32, height as u32, samples.collect()).ok_or_else(|| {
        Error::Conversion(format!(
            "Pixel buffer does not match {}x{} RGB image",
            width, height
        ))
    })
}

/// Convert a decoded image into a one-element normalized batch.
pub fn encode_from_image(image: &DecodedImage) -> ImageBatch {
    ImageBatch::from_single(image_to_array(image))
}

pub(crate) fn image_to_array(image: &DecodedImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        byte_to_float(image.get_pixel(x as u32, y as u32)[c])
    })
}

/// Encode an image as PNG for inline upload.
pub fn encode_png(image: &DecodedImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Decode PNG/JPEG/WebP bytes into RGB, dropping alpha and expanding gray.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}
