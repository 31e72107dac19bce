//! Ollama provider for local vision models.
//!
//! Uses `/api/chat` with the color composition schema passed as `format`,
//! which constrains decoding to that shape. No authentication required.

use super::http::post_json;
use super::provider::{AnalysisProvider, AnalysisRequest, ProviderResponse};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn build_body<'a>(
        &'a self,
        request: &'a AnalysisRequest,
        prompt: &'a str,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
                images: [request.image.data.as_str()],
            }],
            format: &request.response_schema,
            stream: false,
            options: ModelOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    format: &'a Value,
    stream: bool,
    options: ModelOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: [&'a str; 1],
}

#[derive(Serialize)]
struct ModelOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    message: ResponseMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl ChatResponse {
    fn tokens_used(&self) -> Option<u32> {
        match (self.prompt_eval_count, self.eval_count) {
            (None, None) => None,
            (prompt, eval) => Some(prompt.unwrap_or(0) + eval.unwrap_or(0)),
        }
    }
}

#[async_trait]
impl AnalysisProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ProviderResponse, AnalysisError> {
        let start = Instant::now();
        // Local models follow `format` more closely when the prompt repeats it.
        let prompt = request.prompt_with_schema();
        let http = self.client.post(format!("{}/api/chat", self.endpoint));

        let resp: ChatResponse =
            post_json(http, &self.build_body(request, &prompt), "Ollama").await?;

        let text = resp.message.content.trim();
        if text.is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "Ollama returned an empty response".to_string(),
            ));
        }

        Ok(ProviderResponse {
            text: text.to_string(),
            tokens_used: resp.tokens_used(),
            model: resp.model.unwrap_or_else(|| self.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::http::test_server::serve_once;
    use crate::analysis::provider::ImageInput;

    fn request() -> AnalysisRequest {
        AnalysisRequest::color_composition(ImageInput {
            data: "AAAA".to_string(),
            media_type: "image/png".to_string(),
        })
    }

    #[test]
    fn test_body_passes_schema_as_format() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3.2-vision");
        let request = request();
        let prompt = request.prompt_with_schema();
        let body = serde_json::to_value(provider.build_body(&request, &prompt)).unwrap();

        assert_eq!(body["format"], request.response_schema);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["images"][0], "AAAA");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("dominantColor"));
        assert_eq!(body["options"]["num_predict"], 1024);
    }

    #[test]
    fn test_response_token_counts_optional() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "{}"}}"#)
                .unwrap();
        assert!(resp.tokens_used().is_none());
        assert!(resp.model.is_none());
    }

    #[tokio::test]
    async fn test_generate_against_local_server() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"model":"llava","message":{"role":"assistant","content":" {\"dominantColor\":\"Red\",\"balance\":\"Even\",\"suggestion\":\"Vintage\"} "},"prompt_eval_count":30,"eval_count":12}"#,
        )
        .await;

        let provider = OllamaProvider::new(&format!("{endpoint}/"), "llama3.2-vision");
        let resp = provider.generate(&request()).await.unwrap();
        assert!(resp.text.starts_with('{'));
        assert_eq!(resp.model, "llava");
        assert_eq!(resp.tokens_used, Some(42));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/chat "));
        assert!(raw.contains(r#""format":{"#));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let provider = OllamaProvider::new("http://127.0.0.1:1/", "llama3.2-vision");
        assert!(!provider.is_available().await);
    }
}
