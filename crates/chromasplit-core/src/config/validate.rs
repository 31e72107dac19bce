//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: [&str; 4] = ["gemini", "anthropic", "openai", "ollama"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.analysis_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.analysis_timeout_ms must be > 0".into(),
            ));
        }
        if self.encode.compression_type().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "encode.compression must be one of fast, default, best (got {:?})",
                self.encode.compression
            )));
        }
        if !matches!(self.output.format.as_str(), "json" | "jsonl") {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be json or jsonl (got {:?})",
                self.output.format
            )));
        }
        if self.output.file_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "output.file_prefix must not be empty".into(),
            ));
        }
        if !KNOWN_PROVIDERS.contains(&self.analysis.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "analysis.provider must be one of {} (got {:?})",
                KNOWN_PROVIDERS.join(", "),
                self.analysis.provider
            )));
        }
        Ok(())
    }
}
