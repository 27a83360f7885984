use crate::llm::Provider;
use std::fmt;

/// Where a backend call went wrong. Diagnostic only; callers treat every
/// stage the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStage {
    Render,
    Request,
    Http,
    Decode,
    Shape,
}

impl fmt::Display for BackendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendStage::Render => "render",
            BackendStage::Request => "request",
            BackendStage::Http => "http",
            BackendStage::Decode => "decode",
            BackendStage::Shape => "shape",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct BackendError {
    pub provider: Provider,
    pub prompt: &'static str,
    pub stage: BackendStage,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl BackendError {
    pub fn new(
        provider: Provider,
        prompt: &'static str,
        stage: BackendStage,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            prompt,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = Some(raw.into());
        self
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, prompt={}, stage={}): {}",
            self.provider, self.prompt, self.stage, self.detail
        )
    }
}

impl std::error::Error for BackendError {}
