//! ChromaSplit Core - split an image into its color channels.
//!
//! One uploaded image yields five lossless PNGs: the original, red, green and
//! blue isolations (other color samples zeroed, alpha kept), and an unweighted
//! grayscale. An optional color composition analysis is requested from an
//! external multimodal model while the channels are derived.
//!
//! # Architecture
//!
//! ```text
//! bytes → Decode → Encode original ─┬─ Extract R/G/B/Gray → Encode → ┐
//!                                   └─ Analyze (external model) ─────┴→ SplitReport
//! ```
//!
//! Pixel errors abort the request; analysis errors only mark the analysis as
//! failed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chromasplit_core::{ChromaSplit, Config, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() -> chromasplit_core::Result<()> {
//!     let splitter = ChromaSplit::new(Config::load()?);
//!     let report = splitter
//!         .split_file("./photo.jpg".as_ref(), &ProcessOptions::default())
//!         .await?;
//!     println!("{} bytes of red", report.image.channels.red.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

pub use analysis::{AnalysisProvider, AnalysisProviderFactory, AnalyzeOptions, Analyzer};
pub use config::Config;
pub use error::{AnalysisError, ChromaError, ConfigError, PipelineError, PipelineResult, Result};
pub use output::{write_channel_images, OutputFormat, OutputWriter};
pub use pipeline::{EncodedChannels, EncodedImage, ImageProcessor, ProcessOptions, ProcessedImage};
pub use types::{AnalysisOutcome, AnalysisResult, ChannelKind, ColorChannel, SplitRecord};

use std::path::{Path, PathBuf};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Whether (and how) a splitter can analyze images.
enum AnalysisSlot {
    Disabled,
    Unavailable(String),
    Ready(Analyzer),
}

/// Result of one split: the pipeline output and the analysis outcome.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub image: ProcessedImage,
    pub analysis: AnalysisOutcome,
}

impl SplitReport {
    /// Build the serializable record. See [`ProcessedImage::to_record`].
    pub fn to_record(&self, written: &[(ChannelKind, PathBuf)], include_data_urls: bool) -> SplitRecord {
        self.image
            .to_record(self.analysis.clone(), written, include_data_urls)
    }
}

/// ChromaSplit session - the main entry point.
pub struct ChromaSplit {
    config: Config,
    processor: ImageProcessor,
    analysis: AnalysisSlot,
}

impl ChromaSplit {
    /// Create a splitter from configuration.
    ///
    /// A provider that cannot be created (unknown name, missing key) does not
    /// prevent splitting; every analysis is then reported as failed.
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing ChromaSplit v{}", VERSION);
        let processor = ImageProcessor::new(&config);
        let analysis = if config.analysis.enabled {
            Self::build_slot(&config, &config.analysis.provider, None)
        } else {
            AnalysisSlot::Disabled
        };
        Self {
            config,
            processor,
            analysis,
        }
    }

    /// Use a specific provider, regardless of `analysis.enabled`.
    pub fn with_provider(mut self, provider: &str, model_override: Option<&str>) -> Self {
        self.analysis = Self::build_slot(&self.config, provider, model_override);
        self
    }

    /// Use an already-built analyzer.
    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analysis = AnalysisSlot::Ready(analyzer);
        self
    }

    /// Never request analyses.
    pub fn without_analysis(mut self) -> Self {
        self.analysis = AnalysisSlot::Disabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split in-memory image bytes.
    ///
    /// The analysis runs concurrently with channel derivation, using the
    /// already-encoded original. Its failure never fails the split.
    pub async fn split(&self, bytes: Vec<u8>, options: &ProcessOptions) -> Result<SplitReport> {
        let staged = self.processor.stage(bytes).await?;
        let original = staged.original().clone();

        let (image, analysis) = tokio::join!(
            self.processor.finish(staged, options),
            self.analyze(&original, options)
        );

        Ok(SplitReport {
            image: image?,
            analysis,
        })
    }

    /// Read and split an image file.
    pub async fn split_file(&self, path: &Path, options: &ProcessOptions) -> Result<SplitReport> {
        let bytes = self.processor.read_file(path).await?;
        self.split(bytes, options).await
    }

    async fn analyze(&self, original: &EncodedImage, options: &ProcessOptions) -> AnalysisOutcome {
        if options.skip_analysis {
            return AnalysisOutcome::Skipped;
        }
        match &self.analysis {
            AnalysisSlot::Disabled => AnalysisOutcome::Skipped,
            AnalysisSlot::Unavailable(reason) => {
                tracing::warn!("Color analysis unavailable: {reason}");
                AnalysisOutcome::Failed {
                    error: reason.clone(),
                }
            }
            AnalysisSlot::Ready(analyzer) => analyzer.outcome(original).await,
        }
    }

    fn build_slot(config: &Config, provider: &str, model_override: Option<&str>) -> AnalysisSlot {
        match AnalysisProviderFactory::create(provider, &config.analysis, model_override) {
            Ok(provider) => {
                let options = AnalyzeOptions::from_config(&config.analysis, &config.limits);
                AnalysisSlot::Ready(Analyzer::new(provider, options))
            }
            Err(e) => {
                tracing::debug!("Analysis provider '{provider}' not created: {e}");
                AnalysisSlot::Unavailable(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255])))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_new_with_defaults() {
        let splitter = ChromaSplit::new(Config::default());
        assert_eq!(splitter.config().processing.parallel_workers, 4);
    }

    #[tokio::test]
    async fn test_skip_analysis_option() {
        let splitter = ChromaSplit::new(Config::default());
        let options = ProcessOptions {
            skip_analysis: true,
            ..ProcessOptions::default()
        };
        let report = splitter.split(png_bytes(), &options).await.unwrap();
        assert!(matches!(report.analysis, AnalysisOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_disabled_analysis_is_skipped() {
        let splitter = ChromaSplit::new(Config::default()).without_analysis();
        let report = splitter
            .split(png_bytes(), &ProcessOptions::default())
            .await
            .unwrap();
        assert!(matches!(report.analysis, AnalysisOutcome::Skipped));
        assert_eq!(report.image.width, 2);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_only_analysis() {
        let splitter =
            ChromaSplit::new(Config::default()).with_provider("no-such-provider", None);
        let report = splitter
            .split(png_bytes(), &ProcessOptions::default())
            .await
            .unwrap();
        assert!(report.analysis.is_failed());
        assert!(!report.image.channels.grayscale.is_empty());
    }

    #[tokio::test]
    async fn test_decode_error_surfaces() {
        let splitter = ChromaSplit::new(Config::default()).without_analysis();
        let err = splitter
            .split(vec![1, 2, 3], &ProcessOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChromaError::Pipeline(e) if e.is_decode_failure()));
    }
}
