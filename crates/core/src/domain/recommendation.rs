use crate::domain::ticker::TickerSymbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output of the analyze flow, returned as the model produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recommendation: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationaleExplanation {
    pub rationale: String,
}

/// Weekly picks. The prompt asks for five tickers but the count is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTopStocks {
    pub stocks: Vec<String>,
    pub rationale: String,
}

/// Classified form of the model's free-form recommendation label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "raw", rename_all = "snake_case")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayCategory {
    Positive,
    Destructive,
    Neutral,
}

impl Recommendation {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Recommendation::Buy,
            "sell" => Recommendation::Sell,
            "hold" => Recommendation::Hold,
            _ => Recommendation::Unrecognized(raw.to_string()),
        }
    }

    pub fn display_category(&self) -> DisplayCategory {
        match self {
            Recommendation::Buy => DisplayCategory::Positive,
            Recommendation::Sell => DisplayCategory::Destructive,
            Recommendation::Hold | Recommendation::Unrecognized(_) => DisplayCategory::Neutral,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Buy => f.write_str("buy"),
            Recommendation::Sell => f.write_str("sell"),
            Recommendation::Hold => f.write_str("hold"),
            Recommendation::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// The closed set the explain flow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainKind {
    Buy,
    Sell,
}

impl ExplainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExplainKind::Buy => "buy",
            ExplainKind::Sell => "sell",
        }
    }
}

impl fmt::Display for ExplainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExplainKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(ExplainKind::Buy),
            "sell" => Ok(ExplainKind::Sell),
            other => anyhow::bail!("recommendation must be buy or sell (got {other:?})"),
        }
    }
}

impl TryFrom<&Recommendation> for ExplainKind {
    type Error = anyhow::Error;

    fn try_from(value: &Recommendation) -> Result<Self, Self::Error> {
        match value {
            Recommendation::Buy => Ok(ExplainKind::Buy),
            Recommendation::Sell => Ok(ExplainKind::Sell),
            other => anyhow::bail!("only buy or sell recommendations can be explained (got {other})"),
        }
    }
}

/// An analysis as the dashboard keeps it: the raw label plus its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzedStock {
    pub ticker: TickerSymbol,
    pub recommendation_text: String,
    pub recommendation: Recommendation,
    pub rationale: String,
}

impl AnalyzedStock {
    pub fn new(ticker: TickerSymbol, analysis: AnalysisResult) -> Self {
        let recommendation = Recommendation::classify(&analysis.recommendation);
        Self {
            ticker,
            recommendation_text: analysis.recommendation,
            recommendation,
            rationale: analysis.rationale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(Recommendation::classify("BUY"), Recommendation::Buy);
        assert_eq!(Recommendation::classify(" Sell "), Recommendation::Sell);
        assert_eq!(Recommendation::classify("hold"), Recommendation::Hold);
    }

    #[test]
    fn unrecognized_keeps_raw_text_and_is_neutral() {
        let rec = Recommendation::classify("Strong Buy");
        assert_eq!(rec, Recommendation::Unrecognized("Strong Buy".to_string()));
        assert_eq!(rec.to_string(), "Strong Buy");
        assert_eq!(rec.display_category(), DisplayCategory::Neutral);
        assert_eq!(Recommendation::Sell.display_category(), DisplayCategory::Destructive);
    }

    #[test]
    fn explain_kind_only_accepts_buy_or_sell() {
        assert_eq!(ExplainKind::try_from(&Recommendation::Sell).unwrap(), ExplainKind::Sell);
        assert!(ExplainKind::try_from(&Recommendation::Hold).is_err());
        assert!(serde_json::from_str::<ExplainKind>("\"hold\"").is_err());
        assert_eq!("BUY".parse::<ExplainKind>().unwrap(), ExplainKind::Buy);
    }

    #[test]
    fn analyzed_stock_preserves_original_label() {
        let ticker = TickerSymbol::new("AAPL").unwrap();
        let stock = AnalyzedStock::new(
            ticker,
            AnalysisResult {
                recommendation: "Buy".to_string(),
                rationale: "Strong services growth.".to_string(),
            },
        );
        assert_eq!(stock.recommendation, Recommendation::Buy);
        assert_eq!(stock.recommendation_text, "Buy");
    }
}
