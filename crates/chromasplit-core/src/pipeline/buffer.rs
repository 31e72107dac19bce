//! In-memory RGBA8 raster shared by every pipeline stage.

use image::RgbaImage;

use crate::error::{PipelineError, PipelineResult};

/// Bytes per RGBA sample.
pub const CHANNELS: usize = 4;

/// A decoded raster: `width * height` interleaved R,G,B,A samples.
///
/// The sample vector always holds exactly `width * height * 4` bytes and both
/// dimensions are non-zero. Buffers are immutable once built; derived images
/// are fresh allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA samples, checking the length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> PipelineResult<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::ZeroDimensions { width, height });
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(PipelineError::InvalidBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        f: impl Fn(u32, u32) -> [u8; 4],
    ) -> PipelineResult<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Same-sized buffer built from an already-validated sample vector.
    ///
    /// Only used by transforms that map one buffer onto another of equal size.
    pub(crate) fn with_samples_of(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The flat R,G,B,A sample slice.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Sample at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(CHANNELS)
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = PipelineError;

    fn try_from(image: RgbaImage) -> PipelineResult<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_exact_length() {
        let buffer = PixelBuffer::new(2, 3, vec![0; 24]).unwrap();
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.pixel_count(), 6);
        assert_eq!(buffer.pixels().count(), 6);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        match err {
            PipelineError::InvalidBuffer {
                expected, actual, ..
            } => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("Expected InvalidBuffer, got {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        assert!(matches!(
            PixelBuffer::new(0, 5, vec![]),
            Err(PipelineError::ZeroDimensions { width: 0, height: 5 })
        ));
        assert!(matches!(
            PixelBuffer::new(5, 0, vec![]),
            Err(PipelineError::ZeroDimensions { .. })
        ));
    }

    #[test]
    fn test_pixel_lookup_is_row_major() {
        let buffer = PixelBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 7, 255]).unwrap();
        assert_eq!(buffer.pixel(2, 1), Some([2, 1, 7, 255]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 7, 255]));
        assert_eq!(buffer.pixel(3, 0), None);
        assert_eq!(&buffer.as_raw()[4..8], &[1, 0, 7, 255]);
    }

    #[test]
    fn test_rgba_image_conversion() {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([9, 8, 7, 6]));
        let buffer = PixelBuffer::try_from(image).unwrap();
        assert_eq!(buffer.pixel(3, 3), Some([9, 8, 7, 6]));
        assert_eq!(buffer.as_raw().len(), 64);
    }
}
