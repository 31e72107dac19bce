//! Error types for the ChromaSplit pipeline.
//!
//! Errors are organized by stage. Pipeline errors abort the whole request;
//! analysis errors are recovered at the boundary and never invalidate an
//! already-computed channel bundle.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for ChromaSplit operations.
#[derive(Error, Debug)]
pub enum ChromaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pixel pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Color analysis errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pixel pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No bytes were supplied
    #[error("Input is empty")]
    EmptyInput,

    /// Bytes are not a decodable image
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Image format could not be recognized from content
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// Image declares a zero width or height
    #[error("Degenerate image dimensions: {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Input exceeds size limit
    #[error("File too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Sample data does not match the declared dimensions
    #[error("Invalid pixel buffer: expected {expected} samples for {width}x{height}, got {actual}")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// PNG encoding failed
    #[error("Encode error for {channel} channel: {message}")]
    Encode { channel: String, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Blocking worker failed to complete
    #[error("Worker error: {message}")]
    Worker { message: String },
}

impl PipelineError {
    /// Whether this error means the input itself could not be turned into pixels.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyInput
                | PipelineError::Decode { .. }
                | PipelineError::UnsupportedFormat
                | PipelineError::ZeroDimensions { .. }
        )
    }
}

/// Errors from the external color analysis collaborator.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The HTTP request failed or returned a non-success status
    #[error("{message}")]
    Request {
        message: String,
        status_code: Option<u16>,
    },

    /// The provider did not answer within the timeout
    #[error("Analysis timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The response body was not the structured JSON we asked for
    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    /// The structured response is missing a required field
    #[error("Analysis response is missing required field `{0}`")]
    MissingField(&'static str),

    /// Provider is unknown or lacks credentials
    #[error("Analysis provider not configured: {0}")]
    NotConfigured(String),
}

/// Convenience type alias for ChromaSplit results.
pub type Result<T> = std::result::Result<T, ChromaError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
