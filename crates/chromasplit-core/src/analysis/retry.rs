//! Retry utilities for transient analysis failures.

use crate::error::AnalysisError;
use std::time::Duration;

/// Upper bound on any single backoff.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Determine whether an analysis error is worth retrying.
///
/// Retryable: timeouts, rate limits (429), server errors (5xx), connection
/// failures. Everything about the answer itself (malformed JSON, missing
/// fields) and configuration problems are final.
pub fn is_retryable(error: &AnalysisError) -> bool {
    match error {
        AnalysisError::Timeout { .. } => true,
        AnalysisError::Request {
            status_code: Some(code),
            ..
        } => *code == 429 || (500..=599).contains(code),
        AnalysisError::Request {
            status_code: None,
            message,
        } => message.contains("timed out") || message.contains("connect"),
        _ => false,
    }
}

/// Exponential backoff: `base_delay * 2^attempt`, capped at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}
