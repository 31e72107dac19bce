//! JSON-over-HTTP exchange shared by the hosted providers.
//!
//! No per-request timer is set here: the analyzer owns the deadline
//! (`limits.analysis_timeout_ms`) and drops the future when it expires.

use crate::error::AnalysisError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// POST `body` as JSON and decode a successful response as `R`.
///
/// Transport failures and non-2xx statuses become [`AnalysisError::Request`]
/// (with the status when there is one); an undecodable body becomes
/// [`AnalysisError::MalformedResponse`].
pub(crate) async fn post_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
    label: &str,
) -> Result<R, AnalysisError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let resp = request
        .json(body)
        .send()
        .await
        .map_err(|e| AnalysisError::Request {
            message: format!("{label} request failed: {e}"),
            status_code: None,
        })?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(AnalysisError::Request {
            message: format!("{label} HTTP {status}: {text}"),
            status_code: Some(status.as_u16()),
        });
    }

    resp.json()
        .await
        .map_err(|e| AnalysisError::MalformedResponse(format!("{label} response: {e}")))
}
