//! Pipeline orchestration - wires decode, extraction, encoding, and histograms together.

use image::ImageFormat;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{AnalysisOutcome, ChannelKind, ChannelRecord, SplitRecord};

use super::buffer::PixelBuffer;
use super::decode::{format_to_string, DecodedImage, ImageDecoder};
use super::encode::{EncodedImage, PngWriter};
use super::extract::{extract, DerivedChannels};
use super::hash::content_hash;
use super::histogram::{histograms, Histogram};
use super::validate::Validator;

/// Options for controlling a single split.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Compute red/green/blue histograms of the original
    pub include_histograms: bool,
    /// Don't call the color analysis provider
    pub skip_analysis: bool,
}

/// The original buffer plus its four derivatives, each independently owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBundle {
    pub original: PixelBuffer,
    pub red: PixelBuffer,
    pub green: PixelBuffer,
    pub blue: PixelBuffer,
    pub grayscale: PixelBuffer,
}

impl ChannelBundle {
    /// Derive the four channel buffers from `original` and take ownership of all five.
    pub fn from_original(original: PixelBuffer) -> Self {
        let DerivedChannels {
            red,
            green,
            blue,
            grayscale,
        } = extract(&original);
        Self {
            original,
            red,
            green,
            blue,
            grayscale,
        }
    }

    pub fn get(&self, kind: ChannelKind) -> &PixelBuffer {
        match kind {
            ChannelKind::Original => &self.original,
            ChannelKind::Red => &self.red,
            ChannelKind::Green => &self.green,
            ChannelKind::Blue => &self.blue,
            ChannelKind::Grayscale => &self.grayscale,
        }
    }
}

/// The five encoded outputs of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChannels {
    pub original: EncodedImage,
    pub red: EncodedImage,
    pub green: EncodedImage,
    pub blue: EncodedImage,
    pub grayscale: EncodedImage,
}

impl EncodedChannels {
    pub fn get(&self, kind: ChannelKind) -> &EncodedImage {
        match kind {
            ChannelKind::Original => &self.original,
            ChannelKind::Red => &self.red,
            ChannelKind::Green => &self.green,
            ChannelKind::Blue => &self.blue,
            ChannelKind::Grayscale => &self.grayscale,
        }
    }

    /// All outputs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelKind, &EncodedImage)> + '_ {
        ChannelKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// A decoded image whose original has already been encoded.
///
/// The encoded original can be handed to the color analysis while the
/// remaining channels are derived.
pub struct StagedImage {
    decoded: DecodedImage,
    content_hash: String,
    original: EncodedImage,
}

impl StagedImage {
    pub fn original(&self) -> &EncodedImage {
        &self.original
    }
}

/// The result of running one image through the pixel pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// BLAKE3 hash of the submitted bytes
    pub content_hash: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Detected source format
    pub format: ImageFormat,
    /// Size of the submitted bytes
    pub file_size: u64,
    /// Encoded original and derived channels
    pub channels: EncodedChannels,
    /// Red, green and blue histograms of the original, if requested
    pub histograms: Option<Vec<Histogram>>,
}

impl ProcessedImage {
    /// Build the serializable report.
    ///
    /// `written` lists images already saved to disk; `include_data_urls`
    /// embeds every channel as a data URI.
    pub fn to_record(
        &self,
        analysis: AnalysisOutcome,
        written: &[(ChannelKind, PathBuf)],
        include_data_urls: bool,
    ) -> SplitRecord {
        let channels = self
            .channels
            .iter()
            .map(|(kind, image)| ChannelRecord {
                channel: kind,
                bytes: image.len(),
                path: written
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map(|(_, path)| path.clone()),
                data_url: include_data_urls.then(|| image.data_url()),
            })
            .collect();

        SplitRecord {
            content_hash: self.content_hash.clone(),
            width: self.width,
            height: self.height,
            format: format_to_string(self.format),
            file_size: self.file_size,
            channels,
            histograms: self.histograms.clone(),
            analysis,
        }
    }
}

/// The image processor that orchestrates the pixel pipeline.
pub struct ImageProcessor {
    decoder: ImageDecoder,
    validator: Validator,
    writer: PngWriter,
    pool: Option<Arc<ThreadPool>>,
}

impl ImageProcessor {
    /// Create a new image processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        let pool = match ThreadPoolBuilder::new()
            .num_threads(config.processing.parallel_workers)
            .thread_name(|i| format!("chromasplit-pixel-{i}"))
            .build()
        {
            Ok(pool) => Some(Arc::new(pool)),
            Err(e) => {
                tracing::warn!("Failed to build pixel worker pool, using global pool: {e}");
                None
            }
        };

        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            validator: Validator::new(config.limits.clone()),
            writer: PngWriter::new(&config.encode),
            pool,
        }
    }

    /// Run the full pipeline: decode once, derive four channels, encode five images.
    pub async fn process(
        &self,
        bytes: Vec<u8>,
        options: &ProcessOptions,
    ) -> PipelineResult<ProcessedImage> {
        let staged = self.stage(bytes).await?;
        self.finish(staged, options).await
    }

    /// Read and process an image file.
    pub async fn process_file(
        &self,
        path: &Path,
        options: &ProcessOptions,
    ) -> PipelineResult<ProcessedImage> {
        let bytes = self.read_file(path).await?;
        self.process(bytes, options).await
    }

    /// Validate and read an image file into memory.
    pub async fn read_file(&self, path: &Path) -> PipelineResult<Vec<u8>> {
        self.validator.validate(path)?;
        tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Decode {
                message: format!("Cannot read {}: {}", path.display(), e),
            })
    }

    /// Decode without deriving anything.
    pub async fn decode(&self, bytes: Vec<u8>) -> PipelineResult<DecodedImage> {
        self.decoder.decode(bytes).await
    }

    /// Decode the input and encode the original.
    pub async fn stage(&self, bytes: Vec<u8>) -> PipelineResult<StagedImage> {
        let start = Instant::now();
        let content_hash = content_hash(&bytes);

        let decoded = self.decoder.decode(bytes).await?;
        tracing::trace!("  Decode: {:?}", start.elapsed());

        let encode_start = Instant::now();
        let writer = self.writer.clone();
        let (decoded, original) = self
            .run_pixel_job("encode", move || {
                let original = writer.encode(&decoded.pixels, ChannelKind::Original)?;
                Ok((decoded, original))
            })
            .await?;
        tracing::trace!("  Encode original: {:?}", encode_start.elapsed());

        Ok(StagedImage {
            decoded,
            content_hash,
            original,
        })
    }

    /// Derive and encode the four channels of a staged image.
    pub async fn finish(
        &self,
        staged: StagedImage,
        options: &ProcessOptions,
    ) -> PipelineResult<ProcessedImage> {
        let start = Instant::now();
        let writer = self.writer.clone();
        let include_histograms = options.include_histograms;
        let StagedImage {
            decoded,
            content_hash,
            original,
        } = staged;
        let format = decoded.format;
        let file_size = decoded.file_size;

        let (channels, histograms) = self
            .run_pixel_job("split", move || {
                let bundle = ChannelBundle::from_original(decoded.pixels);
                let channels = encode_derived(&writer, &bundle, original)?;
                let counts = include_histograms.then(|| histograms(&bundle.original));
                Ok((channels, counts))
            })
            .await?;

        tracing::debug!(
            "Split {}x{} {} image in {:?}",
            channels.original.width(),
            channels.original.height(),
            format_to_string(format),
            start.elapsed()
        );

        Ok(ProcessedImage {
            content_hash,
            width: channels.original.width(),
            height: channels.original.height(),
            format,
            file_size,
            channels,
            histograms,
        })
    }

    /// Run CPU-bound pixel work on a blocking thread inside the worker pool.
    async fn run_pixel_job<T, F>(&self, stage: &str, job: F) -> PipelineResult<T>
    where
        F: FnOnce() -> PipelineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || match pool {
            Some(pool) => pool.install(job),
            None => job(),
        })
        .await
        .map_err(|e| PipelineError::Worker {
            message: format!("{stage} task join error: {e}"),
        })?
    }
}

/// Encode the four derived buffers concurrently; any failure aborts the bundle.
fn encode_derived(
    writer: &PngWriter,
    bundle: &ChannelBundle,
    original: EncodedImage,
) -> PipelineResult<EncodedChannels> {
    let ((red, green), (blue, grayscale)) = rayon::join(
        || {
            rayon::join(
                || writer.encode(&bundle.red, ChannelKind::Red),
                || writer.encode(&bundle.green, ChannelKind::Green),
            )
        },
        || {
            rayon::join(
                || writer.encode(&bundle.blue, ChannelKind::Blue),
                || writer.encode(&bundle.grayscale, ChannelKind::Grayscale),
            )
        },
    );
    Ok(EncodedChannels {
        original,
        red: red?,
        green: green?,
        blue: blue?,
        grayscale: grayscale?,
    })
}
