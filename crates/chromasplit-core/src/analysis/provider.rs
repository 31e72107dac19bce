//! Analysis provider trait and request/response types.
//!
//! Defines the interface every color analysis backend implements, plus the
//! factory that picks a backend from CLI flags and config.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::EncodedImage;
use async_trait::async_trait;
use serde_json::json;

/// Fixed instruction sent with every color composition request.
pub const COLOR_COMPOSITION_PROMPT: &str = "Analyze this image's color composition. Provide: \
     1. Dominant color mood. \
     2. The balance between Red, Green, and Blue channels. \
     3. A creative suggestion for color grading (e.g., cinematic, vintage, high-contrast). \
     Return as JSON.";

/// Base64-encoded image ready to send to a model API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (always "image/png" for encoder output)
    pub media_type: String,
}

impl ImageInput {
    /// Wrap an already-encoded image without re-encoding pixels.
    pub fn from_encoded(image: &EncodedImage) -> Self {
        Self {
            data: image.to_base64(),
            media_type: image.media_type().to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request for a structured color composition analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The image to analyze
    pub image: ImageInput,
    /// Text prompt for the model
    pub prompt: String,
    /// JSON Schema the answer must follow
    pub response_schema: serde_json::Value,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl AnalysisRequest {
    /// Build the color composition request for one image.
    pub fn color_composition(image: ImageInput) -> Self {
        Self {
            image,
            prompt: COLOR_COMPOSITION_PROMPT.to_string(),
            response_schema: color_composition_schema(),
            max_tokens: 1024,
            temperature: 0.3,
        }
    }

    /// The prompt with the expected JSON shape spelled out, for providers
    /// that cannot enforce a response schema themselves.
    pub fn prompt_with_schema(&self) -> String {
        format!(
            "{}\nRespond with only a JSON object matching this schema: {}",
            self.prompt, self.response_schema
        )
    }
}

/// Schema of the three-field answer. All fields are required strings.
pub fn color_composition_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "dominantColor": { "type": "string" },
            "balance": { "type": "string" },
            "suggestion": { "type": "string" }
        },
        "required": ["dominantColor", "balance", "suggestion"]
    })
}

/// Raw answer from a provider, before the JSON is validated.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Generated text (expected to hold a JSON object)
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all analysis providers implement.
///
/// Uses `async_trait` so providers can sit behind `Box<dyn AnalysisProvider>`.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Provider name for logging (e.g., "gemini", "ollama").
    fn name(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Send the request and return the model's raw text.
    async fn generate(&self, request: &AnalysisRequest)
        -> Result<ProviderResponse, AnalysisError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the appropriate provider from CLI flags and config.
pub struct AnalysisProviderFactory;

impl AnalysisProviderFactory {
    /// Create a provider by name.
    ///
    /// # Arguments
    /// * `provider` - "gemini", "anthropic", "openai" or "ollama"
    /// * `config` - The full analysis config section
    /// * `model_override` - Optional model name that overrides the config default
    pub fn create(
        provider: &str,
        config: &AnalysisConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn AnalysisProvider>, AnalysisError> {
        let pick_model = |default: &str| model_override.unwrap_or(default).to_string();

        match provider {
            "gemini" => {
                let cfg = config.gemini.clone().unwrap_or_default();
                let api_key = require_key(&cfg.api_key, "Gemini", "GEMINI_API_KEY")?;
                Ok(Box::new(super::gemini::GeminiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &pick_model(&cfg.model),
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = require_key(&cfg.api_key, "Anthropic", "ANTHROPIC_API_KEY")?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key,
                    &pick_model(&cfg.model),
                )))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = require_key(&cfg.api_key, "OpenAI", "OPENAI_API_KEY")?;
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key,
                    &pick_model(&cfg.model),
                )))
            }
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &pick_model(&cfg.model),
                )))
            }
            other => Err(AnalysisError::NotConfigured(format!(
                "Unknown analysis provider: {other}"
            ))),
        }
    }
}

fn require_key(raw: &str, label: &str, env_var: &str) -> Result<String, AnalysisError> {
    resolve_env_var(raw).ok_or_else(|| {
        AnalysisError::NotConfigured(format!("{label} API key not set. Set {env_var} env var."))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnthropicConfig, GeminiConfig};
    use crate::pipeline::{encode::encode, PixelBuffer};

    fn sample_input() -> ImageInput {
        let buffer = PixelBuffer::from_fn(2, 2, |_, _| [1, 2, 3, 255]).unwrap();
        ImageInput::from_encoded(&encode(&buffer).unwrap())
    }

    #[test]
    fn test_image_input_is_png() {
        let input = sample_input();
        assert_eq!(input.media_type, "image/png");
        assert!(input.data.starts_with("iVBORw0KGgo"));
        assert!(input.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_color_composition_request() {
        let request = AnalysisRequest::color_composition(sample_input());
        assert!(request.prompt.contains("Dominant color mood"));
        assert!(request.prompt.contains("Red, Green, and Blue"));
        assert!(request.prompt.ends_with("Return as JSON."));
        let required = request.response_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
    }

    #[test]
    fn test_prompt_with_schema_names_fields() {
        let request = AnalysisRequest::color_composition(sample_input());
        let prompt = request.prompt_with_schema();
        assert!(prompt.starts_with(COLOR_COMPOSITION_PROMPT));
        for field in ["dominantColor", "balance", "suggestion"] {
            assert!(prompt.contains(field), "missing {field}");
        }
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_CHROMA_123}"), None);
    }

    #[test]
    fn test_factory_unknown_provider() {
        let err = AnalysisProviderFactory::create("dalle", &AnalysisConfig::default(), None)
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::NotConfigured(msg) if msg.contains("dalle")));
    }

    #[test]
    fn test_factory_missing_key() {
        let config = AnalysisConfig {
            anthropic: Some(AnthropicConfig {
                api_key: "${DEFINITELY_NOT_SET_CHROMA_456}".to_string(),
                ..AnthropicConfig::default()
            }),
            ..AnalysisConfig::default()
        };
        let err = AnalysisProviderFactory::create("anthropic", &config, None)
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::NotConfigured(_)));
    }

    #[test]
    fn test_factory_literal_key_and_model_override() {
        let config = AnalysisConfig {
            gemini: Some(GeminiConfig {
                api_key: "literal-key".to_string(),
                ..GeminiConfig::default()
            }),
            ..AnalysisConfig::default()
        };
        let provider =
            AnalysisProviderFactory::create("gemini", &config, Some("gemini-custom")).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_factory_ollama_needs_no_key() {
        let provider =
            AnalysisProviderFactory::create("ollama", &AnalysisConfig::default(), None).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
