//! Color analysis of an encoded original.
//!
//! Wraps a provider with a timeout, optional retries, and validation of the
//! structured answer. A failed analysis never produces partial data.

use super::provider::{AnalysisProvider, AnalysisRequest, ImageInput};
use super::retry;
use super::schema::parse_analysis;
use crate::config::{AnalysisConfig, LimitsConfig};
use crate::error::AnalysisError;
use crate::pipeline::EncodedImage;
use crate::types::{AnalysisOutcome, AnalysisResult};
use std::sync::Arc;
use std::time::Duration;

/// Timeout and retry settings for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt (0 = single attempt)
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retry_attempts: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl AnalyzeOptions {
    pub fn from_config(analysis: &AnalysisConfig, limits: &LimitsConfig) -> Self {
        Self {
            timeout_ms: limits.analysis_timeout_ms,
            retry_attempts: analysis.retry_attempts,
            retry_delay_ms: analysis.retry_delay_ms,
        }
    }
}

/// A validated analysis plus provenance.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub model: String,
    pub latency_ms: u64,
    pub tokens_used: Option<u32>,
}

impl From<Analysis> for AnalysisOutcome {
    fn from(analysis: Analysis) -> Self {
        AnalysisOutcome::Completed {
            analysis: analysis.result,
            model: analysis.model,
            latency_ms: analysis.latency_ms,
            tokens_used: analysis.tokens_used,
        }
    }
}

/// Requests color composition analyses from one provider.
pub struct Analyzer {
    provider: Arc<dyn AnalysisProvider>,
    options: AnalyzeOptions,
}

impl Analyzer {
    pub fn new(provider: Box<dyn AnalysisProvider>, options: AnalyzeOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
        }
    }

    /// Analyze an encoded image.
    ///
    /// Retries only errors classified as transient, and only as many times as
    /// `retry_attempts` allows.
    pub async fn analyze(&self, image: &EncodedImage) -> Result<Analysis, AnalysisError> {
        let request = AnalysisRequest::color_composition(ImageInput::from_encoded(image));

        let mut attempt = 0;
        loop {
            match self.attempt(&request).await {
                Ok(analysis) => return Ok(analysis),
                Err(e) if attempt < self.options.retry_attempts && retry::is_retryable(&e) => {
                    let delay = retry::backoff_duration(attempt, self.options.retry_delay_ms);
                    attempt += 1;
                    tracing::debug!(
                        "Retry {attempt}/{} for {} analysis after {delay:?}: {e}",
                        self.options.retry_attempts,
                        self.provider.name()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Analyze and fold any error into [`AnalysisOutcome::Failed`].
    pub async fn outcome(&self, image: &EncodedImage) -> AnalysisOutcome {
        match self.analyze(image).await {
            Ok(analysis) => {
                tracing::debug!(
                    "Analysis from {} in {}ms",
                    analysis.model,
                    analysis.latency_ms
                );
                analysis.into()
            }
            Err(e) => {
                tracing::warn!("Color analysis failed ({}): {e}", self.provider.name());
                AnalysisOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn attempt(&self, request: &AnalysisRequest) -> Result<Analysis, AnalysisError> {
        let response = tokio::time::timeout(
            Duration::from_millis(self.options.timeout_ms),
            self.provider.generate(request),
        )
        .await
        .map_err(|_| AnalysisError::Timeout {
            timeout_ms: self.options.timeout_ms,
        })??;

        let result = parse_analysis(&response.text)?;
        Ok(Analysis {
            result,
            model: response.model,
            latency_ms: response.latency_ms,
            tokens_used: response.tokens_used,
        })
    }
}
