use crate::domain::contract::LlmWeeklyTopStocks;
use crate::domain::recommendation::WeeklyTopStocks;
use crate::flows::run_prompt;
use crate::llm::error::BackendError;
use crate::llm::prompt::WEEKLY_TOP_STOCKS;
use crate::llm::GenerativeBackend;
use serde::Serialize;
use std::sync::Arc;

const REQUESTED_PICKS: usize = 5;

#[derive(Debug, Serialize)]
struct WeeklyInput {}

#[derive(Clone)]
pub struct WeeklyTopGenerator {
    backend: Arc<dyn GenerativeBackend>,
}

impl WeeklyTopGenerator {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate_weekly_top(&self) -> Result<WeeklyTopStocks, BackendError> {
        let weekly =
            run_prompt::<LlmWeeklyTopStocks, _>(self.backend.as_ref(), &WEEKLY_TOP_STOCKS, &WeeklyInput {})
                .await?;

        if weekly.stocks.len() != REQUESTED_PICKS {
            tracing::warn!(
                expected = REQUESTED_PICKS,
                got = weekly.stocks.len(),
                "weekly top stocks returned an unexpected number of tickers"
            );
        }

        Ok(weekly)
    }
}
