use crate::config::Settings;
use crate::llm::error::{BackendError, BackendStage};
use crate::llm::json;
use crate::llm::{GenerativeBackend, PromptRequest, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TOOL_NAME_EMIT_OUTPUT: &str = "emit_output";

#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url = settings
            .anthropic_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .anthropic_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = settings.anthropic_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs = settings
            .anthropic_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        tracing::debug!(%base_url, %model, max_tokens, timeout_secs, "anthropic backend configured");

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    fn error(prompt: &'static str, stage: BackendStage, detail: impl Into<String>) -> BackendError {
        BackendError::new(Provider::Anthropic, prompt, stage, detail)
    }

    async fn create_message(
        &self,
        prompt: &'static str,
        req: &CreateMessageRequest,
    ) -> Result<CreateMessageResponse, BackendError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| Self::error(prompt, BackendStage::Request, format!("invalid api key header: {e}")))?;
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::error(prompt, BackendStage::Request, format!("Anthropic request failed: {e}")))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            Self::error(
                prompt,
                BackendStage::Request,
                format!("failed to read Anthropic response body: {e}"),
            )
        })?;
        if !status.is_success() {
            return Err(Self::error(prompt, BackendStage::Http, format!("status={status}"))
                .with_raw_output(text));
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            Self::error(
                prompt,
                BackendStage::Decode,
                format!("failed to decode Anthropic response: {e}"),
            )
            .with_raw_output(text)
        })
    }

    fn build_request(&self, request: PromptRequest) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: request.system,
            messages: vec![Message {
                role: "user",
                content: request.prompt,
            }],
            tools: Some(vec![Tool {
                name: TOOL_NAME_EMIT_OUTPUT,
                description: "Emit the final answer as structured JSON",
                input_schema: request.output_schema,
            }]),
            tool_choice: Some(ToolChoice::Tool {
                name: TOOL_NAME_EMIT_OUTPUT,
            }),
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_output(res: &CreateMessageResponse) -> Option<serde_json::Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == TOOL_NAME_EMIT_OUTPUT => {
                Some(input.clone())
            }
            _ => None,
        })
    }

    fn structured_output(
        prompt: &'static str,
        res: &CreateMessageResponse,
    ) -> Result<serde_json::Value, BackendError> {
        if let Some(output) = Self::response_tool_output(res) {
            return Ok(output);
        }

        // Fallback to text (should be rare with a forced tool choice).
        let text = Self::response_text(res);
        json::parse_text_output(&text).map_err(|e| {
            Self::error(prompt, BackendStage::Decode, format!("{e:#}")).with_raw_output(text)
        })
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, request: PromptRequest) -> Result<serde_json::Value, BackendError> {
        let prompt = request.prompt_name;
        let req = self.build_request(request);
        let res = self.create_message(prompt, &req).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(prompt, max_tokens = self.max_tokens, "Anthropic stop_reason=max_tokens");
        }

        Self::structured_output(prompt, &res)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
