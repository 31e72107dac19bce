//! Lossless PNG encoding of pixel buffers.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::buffer::PixelBuffer;
use crate::config::EncodeConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::ChannelKind;

/// MIME type of every image the encoder produces.
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// A PNG-encoded image ready to be saved, embedded or sent to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn media_type(&self) -> &'static str {
        PNG_MEDIA_TYPE
    }

    /// Base64 of the PNG bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// `data:image/png;base64,...` URI, embeddable anywhere an image URL is accepted.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", PNG_MEDIA_TYPE, self.to_base64())
    }
}

/// Encodes pixel buffers as RGBA8 PNG.
#[derive(Debug, Clone)]
pub struct PngWriter {
    compression: CompressionType,
}

impl Default for PngWriter {
    fn default() -> Self {
        Self {
            compression: CompressionType::Default,
        }
    }
}

impl PngWriter {
    /// Create a writer from the encoder settings.
    ///
    /// Unknown compression names fall back to the default level; config
    /// validation rejects them before this point.
    pub fn new(config: &EncodeConfig) -> Self {
        Self {
            compression: config.compression_type().unwrap_or(CompressionType::Default),
        }
    }

    /// Encode `buffer`, labelling failures with the channel being written.
    pub fn encode(&self, buffer: &PixelBuffer, channel: ChannelKind) -> PipelineResult<EncodedImage> {
        let mut data = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut data, self.compression, FilterType::Adaptive);
        encoder
            .write_image(
                buffer.as_raw(),
                buffer.width(),
                buffer.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| PipelineError::Encode {
                channel: channel.to_string(),
                message: e.to_string(),
            })?;
        Ok(EncodedImage {
            data,
            width: buffer.width(),
            height: buffer.height(),
        })
    }
}

/// Encode with default settings.
pub fn encode(buffer: &PixelBuffer) -> PipelineResult<EncodedImage> {
    PngWriter::default().encode(buffer, ChannelKind::Original)
}
