//! Image decoding with content-based format detection, limits, and timeout support.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use super::buffer::PixelBuffer;
use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

/// Result of decoding an image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// RGBA8 samples at the image's natural size
    pub pixels: PixelBuffer,
    /// Detected image format
    pub format: ImageFormat,
    /// Size of the encoded input in bytes
    pub file_size: u64,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory image on a blocking thread, bounded by the decode timeout.
    pub async fn decode(&self, bytes: Vec<u8>) -> PipelineResult<DecodedImage> {
        let max_bytes = self.limits.max_file_bytes();
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::FileTooLarge {
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let max_dim = self.limits.max_image_dimension;
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async move {
            tokio::task::spawn_blocking(move || decode_with_limit(&bytes, max_dim)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Worker {
                message: format!("Decode task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }
}

/// Decode bytes of any format the `image` crate can rasterize into RGBA8.
///
/// Sources without alpha come back fully opaque.
pub fn decode(bytes: &[u8]) -> PipelineResult<DecodedImage> {
    decode_with_limit(bytes, u32::MAX)
}

fn decode_with_limit(bytes: &[u8], max_dim: u32) -> PipelineResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let format = image::guess_format(bytes).map_err(|_| PipelineError::UnsupportedFormat)?;

    // Read the header first so oversized or degenerate images fail before allocation
    let (width, height) = reader_for(bytes, format)
        .into_dimensions()
        .map_err(|e| PipelineError::Decode {
            message: e.to_string(),
        })?;
    if width == 0 || height == 0 {
        return Err(PipelineError::ZeroDimensions { width, height });
    }
    if width > max_dim || height > max_dim {
        return Err(PipelineError::ImageTooLarge {
            width,
            height,
            max_dim,
        });
    }

    let image = reader_for(bytes, format)
        .decode()
        .map_err(|e| PipelineError::Decode {
            message: e.to_string(),
        })?;

    let pixels = PixelBuffer::try_from(image.into_rgba8())?;
    Ok(DecodedImage {
        pixels,
        format,
        file_size: bytes.len() as u64,
    })
}

fn reader_for(bytes: &[u8], format: ImageFormat) -> ImageReader<Cursor<&[u8]>> {
    ImageReader::with_format(Cursor::new(bytes), format)
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Ico => "ico".to_string(),
        ImageFormat::Pnm => "pnm".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage, RgbaImage};

    fn encode_as(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_decode_png_keeps_alpha() {
        let source = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 40]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.pixels.pixel(2, 1), Some([10, 20, 30, 40]));
        assert_eq!(decoded.file_size, bytes.len() as u64);
    }

    #[test]
    fn test_decode_without_alpha_is_opaque() {
        let source = RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let bytes = encode_as(DynamicImage::ImageRgb8(source), ImageFormat::Png);
        let decoded = decode(&bytes).unwrap();
        for px in decoded.pixels.pixels() {
            assert_eq!(px, &[1, 2, 3, 255]);
        }
    }

    #[test]
    fn test_decode_jpeg() {
        let source = RgbImage::from_pixel(16, 16, image::Rgb([200, 100, 50]));
        let bytes = encode_as(DynamicImage::ImageRgb8(source), ImageFormat::Jpeg);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.pixels.pixel_count(), 256);
        assert!(decoded.pixels.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn test_decode_lossless_webp() {
        let source = RgbaImage::from_fn(4, 3, |x, y| image::Rgba([x as u8 * 60, y as u8 * 80, 7, 200]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source.clone()), ImageFormat::WebP);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::WebP);
        assert_eq!(format_to_string(decoded.format), "webp");
        assert_eq!(decoded.pixels.as_raw(), source.as_raw().as_slice());
    }

    #[test]
    fn test_format_detected_by_content() {
        // Format comes from the bytes, so nothing about a file name matters
        let source = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Bmp);
        assert_eq!(decode(&bytes).unwrap().format, ImageFormat::Bmp);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(err.is_decode_failure(), "got {err:?}");
    }

    #[test]
    fn test_truncated_png_rejected() {
        let source = RgbaImage::from_pixel(8, 8, image::Rgba([5, 5, 5, 255]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let err = decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_decoder_enforces_dimension_limit() {
        let source = RgbaImage::from_pixel(64, 8, image::Rgba([0, 0, 0, 255]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig {
            max_image_dimension: 32,
            ..LimitsConfig::default()
        });
        match decoder.decode(bytes).await {
            Err(PipelineError::ImageTooLarge { width, max_dim, .. }) => {
                assert_eq!(width, 64);
                assert_eq!(max_dim, 32);
            }
            other => panic!("Expected ImageTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decoder_enforces_size_limit() {
        let decoder = ImageDecoder::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        let bytes = vec![0u8; 2 * 1024 * 1024];
        assert!(matches!(
            decoder.decode(bytes).await,
            Err(PipelineError::FileTooLarge { max_mb: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_unbounded_size_limit_does_not_overflow() {
        let source = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let decoder = ImageDecoder::new(LimitsConfig {
            max_file_size_mb: u64::MAX,
            ..LimitsConfig::default()
        });
        assert!(decoder.decode(bytes).await.is_ok());
    }

    #[tokio::test]
    async fn test_decoder_async_success() {
        let source = RgbaImage::from_pixel(5, 5, image::Rgba([9, 9, 9, 9]));
        let bytes = encode_as(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let decoded = ImageDecoder::new(LimitsConfig::default())
            .decode(bytes)
            .await
            .unwrap();
        assert_eq!(decoded.pixels.pixel(4, 4), Some([9, 9, 9, 9]));
    }
}
