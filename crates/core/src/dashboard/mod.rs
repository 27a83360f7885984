//! Dashboard controller: drives the flows in response to user actions and
//! publishes a fresh [`DashboardState`] after every change.
//!
//! State updates are applied synchronously through a `watch` sender and never
//! span an `.await`, so any number of calls can be in flight on one task
//! without locking.

pub mod state;

pub use state::{
    DashboardState, Notification, PendingAnalysis, RationaleStatus, Severity, View,
};

use crate::domain::recommendation::{ExplainKind, WeeklyTopStocks};
use crate::domain::ticker::TickerSymbol;
use crate::flows::Services;
use crate::llm::error::BackendError;
use crate::storage::{KeyValueStore, Watchlist};
use std::sync::Arc;
use tokio::sync::watch;

pub struct Dashboard {
    services: Services,
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<DashboardState>,
}

impl Dashboard {
    /// Builds the controller and seeds the watchlist from `store`.
    pub fn new(services: Services, store: Arc<dyn KeyValueStore>) -> Self {
        let watchlist = Watchlist::load(store.as_ref());
        tracing::debug!(watched = watchlist.len(), "dashboard watchlist seeded");
        let (state, _) = watch::channel(DashboardState::new(watchlist));
        Self {
            services,
            store,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Initial page load. Errors are left to the caller.
    pub async fn load_weekly(&self) -> Result<WeeklyTopStocks, BackendError> {
        let weekly = self.services.weekly.generate_weekly_top().await?;
        let stored = weekly.clone();
        self.state.send_modify(|s| s.weekly = Some(stored));
        Ok(weekly)
    }

    pub fn set_search_input(&self, text: &str) {
        self.state.send_modify(|s| s.search_input = text.to_string());
    }

    /// Validates the search box and, if it holds a usable ticker, analyzes it.
    pub async fn submit_search(&self, raw: &str) {
        if self.state.borrow().is_loading() {
            tracing::debug!("search ignored while an analysis is loading");
            return;
        }

        match TickerSymbol::parse_search(raw) {
            Ok(ticker) => self.select_ticker(ticker).await,
            Err(e) => {
                tracing::debug!(input = raw, error = %e, "search rejected");
                self.state
                    .send_modify(|s| s.raise(Severity::Warning, "Invalid ticker", e.to_string()));
            }
        }
    }

    /// Opens the analysis view for `ticker`.
    pub async fn select_ticker(&self, ticker: TickerSymbol) {
        let mut generation = None;
        self.state
            .send_modify(|s| generation = s.begin_analysis(ticker.clone()));
        let Some(generation) = generation else {
            tracing::debug!(%ticker, "analysis already loading; selection ignored");
            return;
        };

        let result = self.services.recommendations.analyze(&ticker).await;

        let mut applied = false;
        self.state
            .send_modify(|s| applied = s.finish_analysis(generation, result));
        if !applied {
            tracing::info!(%ticker, generation, "dropping stale analysis response");
        }
    }

    pub fn back(&self) {
        self.state.send_modify(|s| s.back());
    }

    /// Explains a row of the weekly list. The weekly list is a buy list, so
    /// the explanation is requested for a buy.
    pub async fn explain(&self, ticker: TickerSymbol) {
        self.explain_as(ticker, ExplainKind::Buy).await;
    }

    /// Explains the stock shown in the analysis view using its own
    /// recommendation. Hold and unrecognized labels cannot be explained.
    pub async fn explain_current(&self) {
        let current = self
            .state
            .borrow()
            .current_stock
            .as_ref()
            .map(|stock| (stock.ticker.clone(), ExplainKind::try_from(&stock.recommendation)));

        match current {
            None => tracing::debug!("explain requested with no stock in view"),
            Some((ticker, Ok(kind))) => self.explain_as(ticker, kind).await,
            Some((ticker, Err(e))) => {
                tracing::debug!(%ticker, error = %e, "recommendation cannot be explained");
                self.state.send_modify(|s| {
                    s.raise(
                        Severity::Warning,
                        "Error",
                        "Only buy or sell recommendations can be explained.",
                    )
                });
            }
        }
    }

    pub async fn explain_as(&self, ticker: TickerSymbol, kind: ExplainKind) {
        let mut id = 0;
        self.state.send_modify(|s| id = s.begin_explain(ticker.clone()));

        let result = self
            .services
            .explainer
            .explain(&ticker, kind)
            .await
            .map(|explanation| explanation.rationale);

        self.state
            .send_modify(|s| s.finish_explain(&ticker, id, result));
    }

    /// Flips `ticker` in the watchlist and persists it. Returns whether the
    /// ticker is watched afterwards.
    pub fn toggle_watchlist(&self, ticker: TickerSymbol) -> bool {
        let mut watched = false;
        let mut snapshot = Watchlist::new();
        self.state.send_modify(|s| {
            watched = s.watchlist.toggle(ticker.clone());
            snapshot = s.watchlist.clone();
        });
        snapshot.persist(self.store.as_ref());
        tracing::debug!(%ticker, watched, "watchlist toggled");
        watched
    }

    pub fn dismiss_notifications(&self) -> Vec<Notification> {
        let mut drained = Vec::new();
        self.state
            .send_modify(|s| drained = std::mem::take(&mut s.notifications));
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedBackend;
    use crate::storage::watchlist::WATCHLIST_KEY;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn t(s: &str) -> TickerSymbol {
        TickerSymbol::new(s).unwrap()
    }

    fn controller(backend: ScriptedBackend) -> (Dashboard, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let dashboard = Dashboard::new(
            Services::new(backend.clone()),
            Arc::new(MemoryStore::new()),
        );
        (dashboard, backend)
    }

    #[tokio::test]
    async fn successful_analysis_lands_in_analysis_view() {
        let (dashboard, _) = controller(ScriptedBackend::replying(json!({
            "recommendation": "buy",
            "rationale": "iPhone cycle plus services."
        })));

        dashboard.select_ticker(t("AAPL")).await;

        let state = dashboard.snapshot();
        assert_eq!(state.view, View::Analysis);
        assert!(!state.is_loading());
        let stock = state.current_stock.unwrap();
        assert_eq!(stock.ticker.as_str(), "AAPL");
        assert_eq!(stock.rationale, "iPhone cycle plus services.");
    }

    #[tokio::test]
    async fn failed_analysis_returns_to_weekly_with_notification() {
        let (dashboard, backend) = controller(ScriptedBackend::failing("unknown symbol"));

        dashboard.select_ticker(t("ZZZZZZ")).await;

        let state = dashboard.snapshot();
        assert_eq!(state.view, View::Weekly);
        assert!(!state.is_loading());
        assert!(state.current_stock.is_none());
        assert_eq!(state.notifications.len(), 1);
        assert_eq!(state.notifications[0].title, "Analysis Failed");
        assert_eq!(state.notifications[0].severity, Severity::Destructive);
        assert!(state.notifications[0].description.contains("\"ZZZZZZ\""));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn too_long_search_is_rejected_without_a_call() {
        let (dashboard, backend) = controller(ScriptedBackend::replying(json!({
            "recommendation": "buy",
            "rationale": "r"
        })));
        dashboard.set_search_input("ZZZZZZ");

        dashboard.submit_search("ZZZZZZ").await;

        let state = dashboard.snapshot();
        assert_eq!(state.view, View::Weekly);
        assert!(state.current_stock.is_none());
        assert_eq!(state.notifications[0].description, "Ticker is too long.");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn search_uppercases_and_resets_input() {
        let (dashboard, backend) = controller(ScriptedBackend::replying(json!({
            "recommendation": "sell",
            "rationale": "r"
        })));
        dashboard.set_search_input("tsla");

        dashboard.submit_search("tsla").await;

        let state = dashboard.snapshot();
        assert_eq!(state.current_stock.unwrap().ticker.as_str(), "TSLA");
        assert!(state.search_input.is_empty());
        assert!(backend.calls()[0].prompt.contains("TSLA"));
    }

    #[tokio::test]
    async fn back_while_loading_ignores_the_late_response() {
        let mut backend = ScriptedBackend::replying(json!({
            "recommendation": "buy",
            "rationale": "r"
        }));
        let gate = backend.gate("AAPL");
        let (dashboard, _) = controller(backend);

        tokio::join!(dashboard.select_ticker(t("AAPL")), async {
            assert!(dashboard.snapshot().is_loading());
            dashboard.back();
            gate.notify_one();
        });

        let state = dashboard.snapshot();
        assert_eq!(state.view, View::Weekly);
        assert!(state.current_stock.is_none());
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn concurrent_explains_are_tracked_independently() {
        let mut backend = ScriptedBackend::new(|req| {
            let rationale = if req.prompt.contains("Ticker: AAPL") {
                "Apple rationale"
            } else {
                "Microsoft rationale"
            };
            Ok(json!({ "rationale": rationale }))
        });
        let aapl_gate = backend.gate("Ticker: AAPL");
        let msft_gate = backend.gate("Ticker: MSFT");
        let (dashboard, _) = controller(backend);
        let mut rx = dashboard.subscribe();

        tokio::join!(
            dashboard.explain(t("AAPL")),
            dashboard.explain(t("MSFT")),
            async {
                let state = dashboard.snapshot();
                assert_eq!(state.rationale_status(&t("AAPL")), RationaleStatus::InFlight);
                assert_eq!(state.rationale_status(&t("MSFT")), RationaleStatus::InFlight);

                msft_gate.notify_one();
                rx.wait_for(|s| s.rationale_status(&t("MSFT")) == RationaleStatus::Idle)
                    .await
                    .unwrap();

                let state = dashboard.snapshot();
                assert_eq!(state.rationale_status(&t("AAPL")), RationaleStatus::InFlight);
                assert_eq!(state.explanation(&t("MSFT")), Some("Microsoft rationale"));
                assert_eq!(state.explanation(&t("AAPL")), None);

                aapl_gate.notify_one();
            }
        );

        let state = dashboard.snapshot();
        assert_eq!(state.rationale_status(&t("AAPL")), RationaleStatus::Idle);
        assert_eq!(state.explanation(&t("AAPL")), Some("Apple rationale"));
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn failed_explain_clears_flag_and_stores_nothing() {
        let (dashboard, _) = controller(ScriptedBackend::failing("timeout"));

        dashboard.explain(t("NVDA")).await;

        let state = dashboard.snapshot();
        assert_eq!(state.rationale_status(&t("NVDA")), RationaleStatus::Idle);
        assert_eq!(state.explanation(&t("NVDA")), None);
        assert_eq!(state.notifications[0].description, "Could not load detailed rationale.");
    }

    #[tokio::test]
    async fn weekly_explain_asks_for_a_buy() {
        let (dashboard, backend) =
            controller(ScriptedBackend::replying(json!({"rationale": "why"})));

        dashboard.explain(t("AMZN")).await;

        assert!(backend.calls()[0].prompt.contains("Recommendation: buy"));
    }

    #[tokio::test]
    async fn hold_recommendation_is_not_explained() {
        let backend = ScriptedBackend::new(|req| {
            if req.prompt_name == "analyzeStockPrompt" {
                Ok(json!({"recommendation": "Hold", "rationale": "wait"}))
            } else {
                Ok(json!({"rationale": "should not be asked"}))
            }
        });
        let (dashboard, backend) = controller(backend);

        dashboard.select_ticker(t("IBM")).await;
        dashboard.explain_current().await;

        assert_eq!(backend.calls().len(), 1);
        let notes = dashboard.dismiss_notifications();
        assert_eq!(notes.len(), 1);
        assert!(dashboard.snapshot().notifications.is_empty());
    }

    #[tokio::test]
    async fn sell_recommendation_is_explained_as_sell() {
        let backend = ScriptedBackend::new(|req| {
            if req.prompt_name == "analyzeStockPrompt" {
                Ok(json!({"recommendation": "SELL", "rationale": "margin pressure"}))
            } else {
                Ok(json!({"rationale": "detailed"}))
            }
        });
        let (dashboard, backend) = controller(backend);

        dashboard.select_ticker(t("INTC")).await;
        dashboard.explain_current().await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].prompt.contains("Recommendation: sell"));
        assert_eq!(dashboard.snapshot().explanation(&t("INTC")), Some("detailed"));
    }

    #[tokio::test]
    async fn watchlist_toggle_persists_and_keeps_view() {
        let store = Arc::new(MemoryStore::new());
        store.set(WATCHLIST_KEY, "[\"MSFT\"]").unwrap();
        let backend = Arc::new(ScriptedBackend::replying(json!({
            "recommendation": "buy",
            "rationale": "r"
        })));
        let dashboard = Dashboard::new(Services::new(backend), store.clone());
        assert!(dashboard.snapshot().is_watched(&t("MSFT")));

        dashboard.select_ticker(t("AAPL")).await;
        assert!(dashboard.toggle_watchlist(t("AAPL")));

        let state = dashboard.snapshot();
        assert_eq!(state.view, View::Analysis);
        assert_eq!(
            store.get(WATCHLIST_KEY).unwrap().as_deref(),
            Some("[\"MSFT\",\"AAPL\"]")
        );

        assert!(!dashboard.toggle_watchlist(t("AAPL")));
        assert_eq!(
            store.get(WATCHLIST_KEY).unwrap().as_deref(),
            Some("[\"MSFT\"]")
        );
    }

    #[tokio::test]
    async fn weekly_load_is_stored_and_errors_propagate() {
        let (dashboard, _) = controller(ScriptedBackend::replying(json!({
            "stocks": ["NVDA", "MSFT", "AAPL", "AMZN", "META"],
            "rationale": "Momentum leaders."
        })));
        let weekly = dashboard.load_weekly().await.unwrap();
        assert_eq!(weekly.stocks.len(), 5);
        assert_eq!(dashboard.snapshot().weekly, Some(weekly));

        let (failing, _) = controller(ScriptedBackend::failing("down"));
        assert!(failing.load_weekly().await.is_err());
        assert!(failing.snapshot().weekly.is_none());
        assert!(failing.snapshot().notifications.is_empty());
    }
}
