//! External color composition analysis.
//!
//! A provider abstraction over several multimodal model backends (Gemini,
//! Anthropic, OpenAI, Ollama) and an analyzer that turns one encoded image
//! into a validated [`AnalysisResult`](crate::types::AnalysisResult).

pub(crate) mod analyzer;
pub(crate) mod anthropic;
pub(crate) mod gemini;
mod http;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod retry;
pub(crate) mod schema;

pub use analyzer::{Analysis, AnalyzeOptions, Analyzer};
pub use provider::{
    AnalysisProvider, AnalysisProviderFactory, AnalysisRequest, ImageInput, ProviderResponse,
    COLOR_COMPOSITION_PROMPT,
};
pub use schema::parse_analysis;
