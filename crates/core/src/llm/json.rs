use crate::domain::contract::OutputContract;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ```, ``` ... ``` or a one-line ```{...}```).
        let mut inner = trimmed.trim_start_matches('`');
        inner = match inner.split_once('\n') {
            Some((first, rest)) if !first.contains('{') => rest,
            _ => inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Parses a free-text model reply into a JSON value.
pub fn parse_text_output(text: &str) -> anyhow::Result<serde_json::Value> {
    let json_str = extract_json(text).context("LLM output contains no JSON object")?;
    serde_json::from_str::<serde_json::Value>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON: {json_str}"))
}

/// Decodes structured output into the contract's raw type and validates it.
pub fn decode_output<C: OutputContract>(value: serde_json::Value) -> anyhow::Result<C::Output> {
    let parsed = serde_json::from_value::<C>(value)
        .context("LLM output does not match the declared output schema")?;
    parsed.validate_and_into_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{LlmAnalysis, LlmWeeklyTopStocks};
    use serde_json::json;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_handles_one_line_fences() {
        assert_eq!(
            extract_json("```{\"rationale\":\"r\"}```"),
            Some("{\"rationale\":\"r\"}".to_string())
        );
        assert_eq!(
            extract_json("```json {\"a\":1}```"),
            Some("{\"a\":1}".to_string())
        );
        let value = parse_text_output("```{\"rationale\":\"r\"}```").unwrap();
        assert_eq!(value, json!({"rationale": "r"}));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn extract_json_rejects_text_without_object() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn parse_text_output_reads_prose_wrapped_object() {
        let text = "Here are the picks:\n{\"stocks\": [\"AAPL\"], \"rationale\": \"r\"}\nGood luck.";
        let value = parse_text_output(text).unwrap();
        let weekly = decode_output::<LlmWeeklyTopStocks>(value).unwrap();
        assert_eq!(weekly.stocks, vec!["AAPL".to_string()]);
    }

    #[test]
    fn parse_text_output_rejects_broken_json() {
        assert!(parse_text_output("{\"stocks\": [\"AAPL\",}").is_err());
    }

    #[test]
    fn decode_output_rejects_partial_analysis() {
        let res = decode_output::<LlmAnalysis>(json!({"rationale": "only half"}));
        assert!(res.is_err());
    }
}
