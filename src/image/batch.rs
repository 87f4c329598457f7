//! Normalized image batches, the graph's native image output.

use super::codec::array_to_image;
use super::DecodedImage;
use crate::{Error, Result};
use ndarray::{Array3, Array4, ArrayView3, Axis};

/// `(N, H, W, 3)` batch of `f32` samples in `[0.0, 1.0]`.
///
/// Construction guarantees at least one image, exactly three channels, and
/// identical height/width across the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    data: Array4<f32>,
}

impl ImageBatch {
    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        let (count, height, width, channels) = data.dim();
        if count == 0 || height == 0 || width == 0 {
            return Err(Error::Conversion(format!(
                "Image batch must be non-empty, got shape {:?}",
                data.shape()
            )));
        }
        if channels != 3 {
            return Err(Error::Conversion(format!(
                "Image batch must have 3 channels, got {}",
                channels
            )));
        }
        Ok(Self { data })
    }

    pub(crate) fn from_single(image: Array3<f32>) -> Self {
        Self {
            data: image.insert_axis(Axis(0)),
        }
    }

    /// Stack same-sized `(H, W, 3)` images in order.
    pub fn stack(images: &[Array3<f32>]) -> Result<Self> {
        let first = images
            .first()
            .ok_or_else(|| Error::Conversion("Cannot stack an empty image list".to_string()))?;

        if let Some((idx, odd)) = images
            .iter()
            .enumerate()
            .find(|(_, image)| image.dim() != first.dim())
        {
            return Err(Error::Conversion(format!(
                "Image {} has shape {:?}, expected {:?}",
                idx,
                odd.shape(),
                first.shape()
            )));
        }

        let views: Vec<ArrayView3<f32>> = images.iter().map(|image| image.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|e| Error::Conversion(format!("Failed to stack images: {}", e)))?;
        Self::from_array(data)
    }

    /// One `width`x`height` image filled with a single normalized color.
    pub fn solid(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        let image = Array3::from_shape_fn((height as usize, width as usize, 3), |(_, _, c)| rgb[c]);
        Self::from_single(image)
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Borrow the `idx`-th image. Panics if `idx >= len()`.
    pub fn image(&self, idx: usize) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), idx)
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    /// Decode every element to 8-bit RGB, e.g. for writing files.
    pub fn to_images(&self) -> Result<Vec<DecodedImage>> {
        self.data
            .outer_iter()
            .map(array_to_image)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_preserves_order() {
        let images = vec![
            Array3::from_elem((2, 3, 3), 0.0f32),
            Array3::from_elem((2, 3, 3), 0.5f32),
            Array3::from_elem((2, 3, 3), 1.0f32),
        ];

        let batch = ImageBatch::stack(&images).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!((batch.height(), batch.width()), (2, 3));
        assert_eq!(batch.image(1)[[0, 0, 0]], 0.5);
        assert_eq!(batch.image(2)[[1, 2, 2]], 1.0);
    }

    #[test]
    fn test_stack_rejects_mismatched_dimensions() {
        let images = vec![
            Array3::<f32>::zeros((2, 3, 3)),
            Array3::<f32>::zeros((3, 2, 3)),
        ];
        let err = ImageBatch::stack(&images).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_stack_rejects_empty_input() {
        assert!(ImageBatch::stack(&[]).is_err());
    }

    #[test]
    fn test_from_array_requires_three_channels() {
        let err = ImageBatch::from_array(Array4::zeros((1, 2, 2, 4))).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_solid_fills_every_sample() {
        let batch = ImageBatch::solid(4, 2, [0.0, 1.0, 0.0]);
        assert_eq!(batch.as_array().shape(), &[1, 2, 4, 3]);
        assert!(batch.image(0).outer_iter().all(|row| row
            .outer_iter()
            .all(|px| px.to_vec() == vec![0.0, 1.0, 0.0])));
    }

    #[test]
    fn test_to_images_decodes_each_element() {
        // Height 3 would be mistaken for channel-first by shape dispatch.
        let images = vec![
            Array3::from_elem((3, 2, 3), 0.0f32),
            Array3::from_elem((3, 2, 3), 1.0f32),
        ];
        let decoded = ImageBatch::stack(&images).unwrap().to_images().unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].dimensions(), (2, 3));
        assert_eq!(decoded[0].get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(decoded[1].get_pixel(1, 1).0, [255, 255, 255]);
    }
}
