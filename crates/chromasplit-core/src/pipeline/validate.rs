//! Input validation before a file is read.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates files before processing.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Quick checks that avoid reading oversized or missing files.
    ///
    /// Checks:
    /// - File exists and is a regular file
    /// - File size is within limits
    /// - File is not empty
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Decode {
            message: format!("Cannot read metadata for {}: {}", path.display(), e),
        })?;

        let max_bytes = self.limits.max_file_bytes();
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if metadata.len() == 0 {
            return Err(PipelineError::EmptyInput);
        }

        Ok(())
    }
}
