use anyhow::{bail, Context};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// A named prompt with `{{field}}` placeholders filled from a serialized input.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub system: Option<&'static str>,
    pub text: &'static str,
}

pub const ANALYZE_STOCK: PromptTemplate = PromptTemplate {
    name: "analyzeStockPrompt",
    system: Some(JSON_ONLY_SYSTEM),
    text: "You are a financial analyst providing stock recommendations. Analyze the stock with \
ticker symbol {{ticker}} and provide a buy, sell, or hold recommendation with a detailed \
rationale. Consider current market data, recent news, and historical trends.",
};

pub const EXPLAIN_RECOMMENDATION: PromptTemplate = PromptTemplate {
    name: "explainRecommendationRationalePrompt",
    system: Some(JSON_ONLY_SYSTEM),
    text: "You are an expert financial analyst. Explain your reasoning behind the following stock \
recommendation. Provide specific market data or news to support your answer.

Ticker: {{ticker}}
Recommendation: {{recommendation}}

Rationale: ",
};

pub const WEEKLY_TOP_STOCKS: PromptTemplate = PromptTemplate {
    name: "generateWeeklyTopStocksPrompt",
    system: Some(JSON_ONLY_SYSTEM),
    text: "You are an expert financial analyst. Your task is to generate a list of the top 5 \
stocks to buy this week based on current market trends, news, and expert insights.

Output the stocks in the following JSON format:
{
  \"stocks\": [\"ticker1\", \"ticker2\", \"ticker3\", \"ticker4\", \"ticker5\"],
  \"rationale\": \"The rationale behind the stock recommendations.\"
}",
};

const JSON_ONLY_SYSTEM: &str =
    "Return ONLY valid JSON matching the requested schema. Do not wrap in markdown.";

impl PromptTemplate {
    /// Renders the template against `input`, which must serialize to an
    /// object. Any placeholder the input does not define is an error.
    pub fn render<T: Serialize + ?Sized>(&self, input: &T) -> anyhow::Result<String> {
        let vars = serde_json::to_value(input)
            .with_context(|| format!("failed to serialize input for {}", self.name))?;
        if !vars.is_object() {
            bail!("prompt input for {} must be a JSON object", self.name);
        }

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(self.text, minijinja::Value::from_serialize(&vars))
            .with_context(|| format!("failed to render {}", self.name))
    }
}
