pub mod anthropic;
pub mod error;
pub mod json;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testing;

use crate::llm::error::BackendError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Other(&'static str),
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::Other(name) => f.write_str(name),
        }
    }
}

/// One call to the generative backend: a rendered prompt plus the JSON schema
/// the reply must conform to.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt_name: &'static str,
    pub system: Option<String>,
    pub prompt: String,
    pub output_schema: serde_json::Value,
}

/// Text-generation capability shared by every flow. Implementations return the
/// structured output as raw JSON; decoding into the declared shape happens in
/// the flow.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, request: PromptRequest) -> Result<serde_json::Value, BackendError>;
}
