//! Pixel pipeline components.
//!
//! - **validate**: Pre-read file checks
//! - **decode**: Bytes to RGBA8 with format detection and limits
//! - **buffer**: The owned RGBA8 pixel grid
//! - **extract**: Red/green/blue isolation and grayscale
//! - **histogram**: Per-channel value distributions
//! - **encode**: Lossless PNG output
//! - **hash**: Content hash of the submitted bytes
//! - **processor**: Orchestrates the full pipeline

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod extract;
pub mod hash;
pub mod histogram;
pub mod processor;
pub mod validate;

pub use buffer::PixelBuffer;
pub use decode::{DecodedImage, ImageDecoder};
pub use encode::{EncodedImage, PngWriter};
pub use extract::{extract, DerivedChannels};
pub use histogram::{histogram, histograms, Histogram, HistogramBin, HistogramSummary};
pub use processor::{
    ChannelBundle, EncodedChannels, ImageProcessor, ProcessOptions, ProcessedImage, StagedImage,
};
pub use validate::Validator;
