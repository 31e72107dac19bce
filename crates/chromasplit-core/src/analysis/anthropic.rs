//! Anthropic provider using the Messages API with forced tool use.
//!
//! The color composition schema is declared as the input schema of a single
//! tool and `tool_choice` pins the model to it, so the answer arrives as the
//! tool call's `input` object rather than free text.

use super::http::post_json;
use super::provider::{AnalysisProvider, AnalysisRequest, ProviderResponse};
use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const TOOL_NAME: &str = "record_color_analysis";

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn build_body<'a>(&'a self, request: &'a AnalysisRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: [Tool {
                name: TOOL_NAME,
                description: "Record the color composition of the supplied image.",
                input_schema: &request.response_schema,
            }],
            tool_choice: ToolChoice {
                kind: "tool",
                name: TOOL_NAME,
            },
            messages: [Message {
                role: "user",
                content: [
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: &request.image.media_type,
                            data: &request.image.data,
                        },
                    },
                    ContentBlock::Text {
                        text: &request.prompt,
                    },
                ],
            }],
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    tools: [Tool<'a>; 1],
    tool_choice: ToolChoice,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Tool<'a> {
    name: &'static str,
    description: &'static str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: [ContentBlock<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    ToolUse { name: String, input: Value },
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// The forced tool call's input as JSON text, falling back to any text blocks.
fn answer_text(blocks: Vec<ResponseBlock>) -> Result<String, AnalysisError> {
    let mut prose = String::new();
    for block in blocks {
        match block {
            ResponseBlock::ToolUse { name, input } if name == TOOL_NAME => {
                return serde_json::to_string(&input)
                    .map_err(|e| AnalysisError::MalformedResponse(e.to_string()));
            }
            ResponseBlock::Text { text } => prose.push_str(&text),
            _ => {}
        }
    }
    let prose = prose.trim();
    if prose.is_empty() {
        return Err(AnalysisError::MalformedResponse(format!(
            "Anthropic response has no `{TOOL_NAME}` call"
        )));
    }
    Ok(prose.to_string())
}

#[async_trait]
impl AnalysisProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ProviderResponse, AnalysisError> {
        let start = Instant::now();
        let http = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);

        let resp: MessagesResponse =
            post_json(http, &self.build_body(request), "Anthropic").await?;

        Ok(ProviderResponse {
            text: answer_text(resp.content)?,
            model: resp.model,
            tokens_used: resp.usage.map(|u| u.input_tokens + u.output_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
