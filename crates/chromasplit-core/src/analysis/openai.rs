//! OpenAI provider using Chat Completions with strict structured outputs.
//!
//! The color composition schema goes out as a `json_schema` response format
//! with `strict: true`, which requires every object in it to forbid
//! additional properties.

use super::http::post_json;
use super::provider::{AnalysisProvider, AnalysisRequest, ProviderResponse};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const SCHEMA_NAME: &str = "color_analysis";

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn build_body<'a>(
        &'a self,
        request: &'a AnalysisRequest,
        image_url: &'a str,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema: strict_schema(&request.response_schema),
                },
            },
            messages: [ChatMessage {
                role: "user",
                content: [
                    ChatContent::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                    ChatContent::Text {
                        text: &request.prompt,
                    },
                ],
            }],
        }
    }
}

/// Copy of `schema` with `additionalProperties: false` on every object node.
fn strict_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out: serde_json::Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), strict_schema(v)))
                .collect();
            if out.get("type").and_then(Value::as_str) == Some("object") {
                out.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(strict_schema).collect()),
        other => other.clone(),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_completion_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: [ChatContent<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContent<'a> {
    ImageUrl { image_url: ImageUrl<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

fn answer_text(choices: Vec<Choice>) -> Result<String, AnalysisError> {
    let message = choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| AnalysisError::MalformedResponse("OpenAI returned no choices".into()))?;
    if let Some(refusal) = message.refusal {
        return Err(AnalysisError::MalformedResponse(format!(
            "OpenAI refused: {refusal}"
        )));
    }
    match message.content.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(AnalysisError::MalformedResponse(
            "OpenAI returned no text content".into(),
        )),
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ProviderResponse, AnalysisError> {
        let start = Instant::now();
        let image_url = request.image.data_url();
        let http = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key);

        let resp: ChatResponse =
            post_json(http, &self.build_body(request, &image_url), "OpenAI").await?;

        Ok(ProviderResponse {
            text: answer_text(resp.choices)?,
            model: resp.model,
            tokens_used: resp.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::provider::ImageInput;

    fn request() -> AnalysisRequest {
        AnalysisRequest::color_composition(ImageInput {
            data: "AAAA".to_string(),
            media_type: "image/png".to_string(),
        })
    }

    #[test]
    fn test_body_requests_strict_json_schema() {
        let provider = OpenAiProvider::new("key", "gpt-4o-mini");
        let request = request();
        let url = request.image.data_url();
        let body = serde_json::to_value(provider.build_body(&request, &url)).unwrap();

        let format = &body["response_format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], SCHEMA_NAME);
        assert_eq!(format["json_schema"]["strict"], true);
        let schema = &format["json_schema"]["schema"];
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], request.response_schema["required"]);

        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image_url");
        assert_eq!(content[0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(content[1]["text"], request.prompt.as_str());
    }

    #[test]
    fn test_strict_schema_reaches_nested_objects() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"inner": {"type": "object", "properties": {}}}
        });
        let strict = strict_schema(&schema);
        assert_eq!(strict["properties"]["inner"]["additionalProperties"], false);
        assert!(schema.get("additionalProperties").is_none());
    }

    #[test]
    fn test_response_without_usage() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"balance\": \"even\"}", "refusal": null}}],
            "model": "gpt-4o-mini"
        }"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.usage.is_none());
        assert_eq!(answer_text(resp.choices).unwrap(), "{\"balance\": \"even\"}");
    }

    #[test]
    fn test_refusal_is_malformed() {
        let raw = r#"{
            "choices": [{"message": {"content": null, "refusal": "I can't help with that."}}],
            "model": "gpt-4o-mini",
            "usage": {"total_tokens": 12}
        }"#;
        let resp: ChatResponse = serde_json::from_str(raw).unwrap();
        let err = answer_text(resp.choices).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(m) if m.contains("refused")));
    }
}
