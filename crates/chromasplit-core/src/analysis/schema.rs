//! Validation of the model's JSON answer.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AnalysisError;
use crate::types::AnalysisResult;

/// Loose shape of the answer; presence is checked afterwards.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default, alias = "dominant_color")]
    dominant_color: Option<String>,
    #[serde(default)]
    balance: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

/// Parse model text into an [`AnalysisResult`].
///
/// Accepts a bare JSON object or one wrapped in Markdown code fences or
/// surrounding prose. Every field must be present and non-blank.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let object = first_json_object(text).ok_or_else(|| {
        AnalysisError::MalformedResponse(format!("no JSON object in response: {}", preview(text)))
    })?;

    let raw: RawAnalysis = serde_json::from_value(Value::Object(object))
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    Ok(AnalysisResult {
        dominant_color: required(raw.dominant_color, "dominantColor")?,
        balance: required(raw.balance, "balance")?,
        suggestion: required(raw.suggestion, "suggestion")?,
    })
}

/// The first complete JSON object in `text`, trying each `{` in turn.
///
/// Braces in surrounding prose are skipped because a candidate only counts
/// when a whole object parses from it; trailing text is ignored.
fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AnalysisError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AnalysisError::MissingField(field)),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
