//! CLI enum types: output format, analysis provider, color channel.

use chromasplit_core::ColorChannel;
use clap::ValueEnum;

/// Supported report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl OutputFormat {
    /// The format named in config, falling back to JSON.
    pub fn from_config(name: &str) -> Self {
        match chromasplit_core::OutputFormat::parse(name) {
            Some(chromasplit_core::OutputFormat::JsonLines) => OutputFormat::Jsonl,
            _ => OutputFormat::Json,
        }
    }
}

impl From<OutputFormat> for chromasplit_core::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => chromasplit_core::OutputFormat::Json,
            OutputFormat::Jsonl => chromasplit_core::OutputFormat::JsonLines,
        }
    }
}

/// Supported color analysis providers.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AnalysisProvider {
    /// Google Gemini API
    Gemini,
    /// Anthropic API
    Anthropic,
    /// OpenAI API
    Openai,
    /// Local Ollama instance
    Ollama,
}

impl std::fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisProvider::Gemini => write!(f, "gemini"),
            AnalysisProvider::Anthropic => write!(f, "anthropic"),
            AnalysisProvider::Openai => write!(f, "openai"),
            AnalysisProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// A single color plane.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl From<Channel> for ColorChannel {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Red => ColorChannel::Red,
            Channel::Green => ColorChannel::Green,
            Channel::Blue => ColorChannel::Blue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_config() {
        assert_eq!(OutputFormat::from_config("jsonl"), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("csv"), OutputFormat::Json);
    }

    #[test]
    fn test_provider_names_match_factory() {
        for provider in AnalysisProvider::value_variants() {
            let name = provider.to_string();
            assert!(["gemini", "anthropic", "openai", "ollama"].contains(&name.as_str()));
        }
    }
}
