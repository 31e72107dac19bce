//! Google Gemini provider using the Generative Language `generateContent` API.
//!
//! The answer shape is enforced server-side with `responseMimeType` and a
//! `responseSchema`.

use super::http::post_json;
use super::provider::{AnalysisProvider, AnalysisRequest, ProviderResponse};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini provider.
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

/// Rewrite JSON Schema `type` names into Gemini's upper-case enum form.
fn to_gemini_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let value = match (key.as_str(), value) {
                    ("type", serde_json::Value::String(t)) => {
                        serde_json::Value::String(t.to_uppercase())
                    }
                    _ => to_gemini_schema(value),
                };
                (key.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>()
            .into(),
        serde_json::Value::Array(items) => items.iter().map(to_gemini_schema).collect(),
        other => other.clone(),
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ProviderResponse, AnalysisError> {
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: to_gemini_schema(&request.response_schema),
                temperature: request.temperature,
            },
        };

        let http = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key);
        let generate_resp: GenerateResponse = post_json(http, &body, "Gemini").await?;

        let text = generate_resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "Gemini returned no text content".to_string(),
            ));
        }

        Ok(ProviderResponse {
            text,
            model: generate_resp.model_version.unwrap_or_else(|| self.model.clone()),
            tokens_used: generate_resp.usage_metadata.and_then(|u| u.total_token_count),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::provider::color_composition_schema;
    use crate::analysis::{AnalyzeOptions, Analyzer};
    use crate::pipeline::{encode::encode, EncodedImage, PixelBuffer};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Accept connections and hold them open without ever replying.
    async fn silent_server() -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicU32::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        (format!("http://{addr}/v1beta"), accepted)
    }

    fn image() -> EncodedImage {
        encode(&PixelBuffer::from_fn(2, 2, |_, _| [30, 60, 90, 255]).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_silent_server_hits_configured_timeout() {
        let (endpoint, _) = silent_server().await;
        let provider = GeminiProvider::new(&endpoint, "key", "gemini-2.5-flash");
        let analyzer = Analyzer::new(
            Box::new(provider),
            AnalyzeOptions {
                timeout_ms: 300,
                retry_attempts: 0,
                retry_delay_ms: 10,
            },
        );

        let start = Instant::now();
        let err = analyzer.analyze(&image()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { timeout_ms: 300 }), "got {err:?}");
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_silent_server_timeout_is_retried() {
        let (endpoint, accepted) = silent_server().await;
        let provider = GeminiProvider::new(&endpoint, "key", "gemini-2.5-flash");
        let analyzer = Analyzer::new(
            Box::new(provider),
            AnalyzeOptions {
                timeout_ms: 200,
                retry_attempts: 1,
                retry_delay_ms: 10,
            },
        );

        let err = analyzer.analyze(&image()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { timeout_ms: 200 }), "got {err:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
            "gemini-2.5-flash",
        );
        assert_eq!(
            provider.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_schema_types_uppercased() {
        let schema = to_gemini_schema(&color_composition_schema());
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["balance"]["type"], "STRING");
        assert_eq!(schema["required"][0], "dominantColor");
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                    Part::Text {
                        text: "hi".to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({}),
                temperature: 0.3,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(value["contents"][0]["parts"][1]["text"], "hi");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}],
            "usageMetadata": {"totalTokenCount": 321},
            "modelVersion": "gemini-2.5-flash-001"
        }"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.usage_metadata.unwrap().total_token_count, Some(321));
        assert_eq!(resp.model_version.as_deref(), Some("gemini-2.5-flash-001"));
    }
}
