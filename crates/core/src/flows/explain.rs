use crate::domain::contract::LlmRationale;
use crate::domain::recommendation::{ExplainKind, RationaleExplanation};
use crate::domain::ticker::TickerSymbol;
use crate::flows::run_prompt;
use crate::llm::error::BackendError;
use crate::llm::prompt::EXPLAIN_RECOMMENDATION;
use crate::llm::GenerativeBackend;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ExplainInput<'a> {
    ticker: &'a str,
    recommendation: ExplainKind,
}

/// Expands on why a ticker is a buy or a sell.
#[derive(Clone)]
pub struct RationaleExplainer {
    backend: Arc<dyn GenerativeBackend>,
}

impl RationaleExplainer {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    pub async fn explain(
        &self,
        ticker: &TickerSymbol,
        recommendation: ExplainKind,
    ) -> Result<RationaleExplanation, BackendError> {
        let input = ExplainInput {
            ticker: ticker.as_str(),
            recommendation,
        };
        run_prompt::<LlmRationale, _>(self.backend.as_ref(), &EXPLAIN_RECOMMENDATION, &input).await
    }
}
