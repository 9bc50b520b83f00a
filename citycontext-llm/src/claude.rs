//! Claude Messages API client for SQL generation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Generation, GenerationMode, GeneratorError, SqlGenerator, SYSTEM_PROMPT};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const MAX_TOKENS: u32 = 1024;

/// Generates SQL by asking Claude with the bundled schema context as the
/// system prompt. The reply is expected to be a JSON object
/// `{"sql": …, "explanation": …}`.
pub struct ClaudeGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SqlGenerator for ClaudeGenerator {
    async fn generate(&self, question: &str) -> Result<Generation, GeneratorError> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            model: &'a str,
            max_tokens: u32,
            system: &'a str,
            messages: [Message<'a>; 1],
        }

        #[derive(serde::Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: String,
        }

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&Request {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                system: SYSTEM_PROMPT,
                messages: [Message {
                    role: "user",
                    content: question,
                }],
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;

        let text = response
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        parse_generation(text)
    }
}

/// Parse the model's reply into a [`Generation`].
///
/// The prompt asks for bare JSON, but models wrap it in a markdown fence
/// often enough that we strip one before parsing.
fn parse_generation(text: &str) -> Result<Generation, GeneratorError> {
    #[derive(Deserialize)]
    struct Reply {
        sql: String,
        #[serde(default)]
        explanation: String,
    }

    let body = strip_code_fence(text.trim());
    let reply: Reply = serde_json::from_str(body)
        .map_err(|err| GeneratorError::UnusableOutput(format!("{err}; got: {body}")))?;

    if reply.sql.trim().is_empty() {
        return Err(GeneratorError::UnusableOutput(
            "model returned empty sql".to_string(),
        ));
    }

    Ok(Generation {
        sql: reply.sql,
        explanation: reply.explanation,
        mode: GenerationMode::Llm,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
