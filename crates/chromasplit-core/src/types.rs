//! Core data types for the ChromaSplit pipeline.
//!
//! These types describe what a split produces: which channels exist, the
//! color analysis returned by the external model, and the serialized report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::pipeline::Histogram;

/// Selector for one of the three color planes (alpha is never isolated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    /// All color planes in R, G, B order.
    pub const ALL: [ColorChannel; 3] = [ColorChannel::Red, ColorChannel::Green, ColorChannel::Blue];

    /// Sample offset of this channel inside an RGBA pixel.
    pub fn offset(self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorChannel::Red => "red",
            ColorChannel::Green => "green",
            ColorChannel::Blue => "blue",
        }
    }
}

impl fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the five images a split produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Original,
    Red,
    Green,
    Blue,
    Grayscale,
}

impl ChannelKind {
    /// All outputs in display order.
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Original,
        ChannelKind::Red,
        ChannelKind::Green,
        ChannelKind::Blue,
        ChannelKind::Grayscale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Original => "original",
            ChannelKind::Red => "red",
            ChannelKind::Green => "green",
            ChannelKind::Blue => "blue",
            ChannelKind::Grayscale => "grayscale",
        }
    }

    /// File name used when the image is saved: `<prefix>-<stem>.png`.
    ///
    /// The grayscale card is saved as `luminance`; every other output uses
    /// its report name.
    pub fn file_name(self, prefix: &str) -> String {
        let stem = match self {
            ChannelKind::Grayscale => "luminance",
            other => other.as_str(),
        };
        format!("{prefix}-{stem}.png")
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural-language color composition analysis from the external model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Dominant color mood
    pub dominant_color: String,

    /// Description of the red/green/blue balance
    pub balance: String,

    /// Color grading suggestion
    pub suggestion: String,
}

/// What happened to the color analysis for one image.
///
/// A failed analysis never carries partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Completed {
        analysis: AnalysisResult,
        model: String,
        latency_ms: u64,
        /// Input plus output tokens, when the provider reports them
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens_used: Option<u32>,
    },
    Failed {
        error: String,
    },
    Skipped,
}

impl AnalysisOutcome {
    /// The analysis, when one completed.
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Completed { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }
}

/// Report entry for a single encoded channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Which output this is
    pub channel: ChannelKind,

    /// Size of the encoded PNG in bytes
    pub bytes: usize,

    /// Where the PNG was written, if it was saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// `data:image/png;base64,...` URI, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

/// Serialized summary of one split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRecord {
    /// BLAKE3 hash of the submitted bytes
    pub content_hash: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Detected source format ("jpeg", "png", "webp", etc.)
    pub format: String,

    /// Size of the submitted file in bytes
    pub file_size: u64,

    /// The five encoded outputs in display order
    pub channels: Vec<ChannelRecord>,

    /// Red, green and blue histograms, if computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<Vec<Histogram>>,

    /// Color analysis outcome
    pub analysis: AnalysisOutcome,
}
