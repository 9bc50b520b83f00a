//! citycontext-llm: natural-language-to-SQL generation.
//!
//! The server treats this crate as an opaque producer of SQL text: a
//! question goes in, SQL plus a human-readable explanation and a mode tag
//! come out. Nothing here is trusted by the rest of the system; generated
//! SQL still passes the safety gate before execution.

mod claude;
mod placeholder;

pub use claude::ClaudeGenerator;
pub use placeholder::PlaceholderGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use citycontext_core::Settings;

/// System prompt with the 3DCityDB schema context, bundled at compile time.
pub(crate) const SYSTEM_PROMPT: &str = include_str!("../prompts/system_prompt.md");

/// Failure in the generation layer.
///
/// Distinct from query validation/execution errors: the query endpoint
/// reports these with `mode = "error"` and never attempts execution.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Claude API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unusable model output: {0}")]
    UnusableOutput(String),
}

/// How the SQL was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Llm,
    Placeholder,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Placeholder => "placeholder",
        }
    }
}

/// One generation result: SQL text, an explanation for the user, and the
/// mode it was produced under.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub sql: String,
    pub explanation: String,
    pub mode: GenerationMode,
}

/// Producer of SQL text from natural-language questions.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> Result<Generation, GeneratorError>;
}

/// Pick the generator implied by the configured credential: Claude when a
/// plausible API key is present, the offline placeholder otherwise.
pub fn generator_for(settings: &Settings) -> Arc<dyn SqlGenerator> {
    if settings.use_llm() {
        Arc::new(ClaudeGenerator::new(settings.anthropic_api_key.clone()))
    } else {
        tracing::info!("no Anthropic API key configured, using placeholder SQL generation");
        Arc::new(PlaceholderGenerator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GenerationMode::Llm).unwrap(),
            "\"llm\""
        );
        assert_eq!(GenerationMode::Placeholder.as_str(), "placeholder");
    }

    #[tokio::test]
    async fn generator_selection_follows_credential() {
        let settings = Settings::default();
        let generator = generator_for(&settings);
        // Placeholder generation must be deterministic and infallible
        let generation = generator
            .generate("how many buildings are there?")
            .await
            .unwrap();
        assert_eq!(generation.mode, GenerationMode::Placeholder);
    }
}
