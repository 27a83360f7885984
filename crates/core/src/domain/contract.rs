use crate::domain::recommendation::{AnalysisResult, RationaleExplanation, WeeklyTopStocks};
use anyhow::ensure;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Declared output shape of a prompt: the JSON schema sent to the model, the
/// raw type the reply is decoded into, and the checks that turn it into the
/// domain value.
pub trait OutputContract: DeserializeOwned {
    type Output;

    fn schema() -> serde_json::Value;

    fn validate_and_into_output(self) -> anyhow::Result<Self::Output>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalysis {
    pub recommendation: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRationale {
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmWeeklyTopStocks {
    pub stocks: Vec<String>,
    pub rationale: String,
}

impl OutputContract for LlmAnalysis {
    type Output = AnalysisResult;

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["recommendation", "rationale"],
            "properties": {
                "recommendation": {
                    "type": "string",
                    "description": "The recommendation (buy, sell, or hold) for the stock."
                },
                "rationale": {
                    "type": "string",
                    "description": "The AI-generated reasoning behind the recommendation."
                }
            }
        })
    }

    fn validate_and_into_output(self) -> anyhow::Result<AnalysisResult> {
        Ok(AnalysisResult {
            recommendation: self.recommendation,
            rationale: self.rationale,
        })
    }
}

impl OutputContract for LlmRationale {
    type Output = RationaleExplanation;

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["rationale"],
            "properties": {
                "rationale": {
                    "type": "string",
                    "description": "The AI's reasoning behind the stock recommendation."
                }
            }
        })
    }

    fn validate_and_into_output(self) -> anyhow::Result<RationaleExplanation> {
        ensure!(
            !self.rationale.trim().is_empty(),
            "rationale must be non-empty"
        );
        Ok(RationaleExplanation {
            rationale: self.rationale,
        })
    }
}

impl OutputContract for LlmWeeklyTopStocks {
    type Output = WeeklyTopStocks;

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["stocks", "rationale"],
            "properties": {
                "stocks": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "A list of the top 5 stock tickers to buy this week."
                },
                "rationale": {
                    "type": "string",
                    "description": "The rationale behind the stock recommendations."
                }
            }
        })
    }

    // Only the shape is checked; five entries is what the prompt asks for, not a rule.
    fn validate_and_into_output(self) -> anyhow::Result<WeeklyTopStocks> {
        Ok(WeeklyTopStocks {
            stocks: self.stocks,
            rationale: self.rationale,
        })
    }
}
