use crate::domain::contract::LlmAnalysis;
use crate::domain::recommendation::AnalysisResult;
use crate::domain::ticker::TickerSymbol;
use crate::flows::run_prompt;
use crate::llm::error::BackendError;
use crate::llm::prompt::ANALYZE_STOCK;
use crate::llm::GenerativeBackend;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct AnalyzeInput<'a> {
    ticker: &'a str,
}

/// Produces a recommendation label and rationale for a single ticker.
#[derive(Clone)]
pub struct RecommendationService {
    backend: Arc<dyn GenerativeBackend>,
}

impl RecommendationService {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    pub async fn analyze(&self, ticker: &TickerSymbol) -> Result<AnalysisResult, BackendError> {
        let input = AnalyzeInput {
            ticker: ticker.as_str(),
        };
        run_prompt::<LlmAnalysis, _>(self.backend.as_ref(), &ANALYZE_STOCK, &input).await
    }
}
