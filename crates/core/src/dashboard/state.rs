use crate::domain::recommendation::{AnalysisResult, AnalyzedStock, WeeklyTopStocks};
use crate::domain::ticker::TickerSymbol;
use crate::storage::Watchlist;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Weekly,
    Analysis,
}

/// An analyze call that has been issued and not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnalysis {
    pub ticker: TickerSymbol,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationaleStatus {
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub raised_at: DateTime<Utc>,
}

/// Everything the dashboard renders. Cloning is cheap: the per-ticker maps
/// are shared and copied only when a snapshot that still shares them is
/// updated.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub view: View,
    pub loading: Option<PendingAnalysis>,
    pub current_stock: Option<AnalyzedStock>,
    pub search_input: String,
    pub weekly: Option<WeeklyTopStocks>,
    pub watchlist: Watchlist,
    pub notifications: Vec<Notification>,
    // ticker -> id of the most recent explain call issued for it
    explain_in_flight: Arc<BTreeMap<TickerSymbol, u64>>,
    explanations: Arc<Vec<(TickerSymbol, String)>>,
    analyze_generation: u64,
    explain_seq: u64,
}

impl DashboardState {
    pub fn new(watchlist: Watchlist) -> Self {
        Self {
            view: View::Weekly,
            loading: None,
            current_stock: None,
            search_input: String::new(),
            weekly: None,
            watchlist,
            notifications: Vec::new(),
            explain_in_flight: Arc::new(BTreeMap::new()),
            explanations: Arc::new(Vec::new()),
            analyze_generation: 0,
            explain_seq: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn rationale_status(&self, ticker: &TickerSymbol) -> RationaleStatus {
        if self.explain_in_flight.contains_key(ticker) {
            RationaleStatus::InFlight
        } else {
            RationaleStatus::Idle
        }
    }

    pub fn explanation(&self, ticker: &TickerSymbol) -> Option<&str> {
        self.explanations
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, rationale)| rationale.as_str())
    }

    /// Stored explanations in the order their tickers were first explained.
    pub fn explanations(&self) -> impl Iterator<Item = (&TickerSymbol, &str)> {
        self.explanations.iter().map(|(t, r)| (t, r.as_str()))
    }

    pub fn is_watched(&self, ticker: &TickerSymbol) -> bool {
        self.watchlist.contains(ticker)
    }

    pub(crate) fn raise(&mut self, severity: Severity, title: &str, description: impl Into<String>) {
        self.notifications.push(Notification {
            severity,
            title: title.to_string(),
            description: description.into(),
            raised_at: Utc::now(),
        });
    }

    /// Enters loading for `ticker`. Returns the call's generation, or `None`
    /// when another analysis is already loading.
    pub(crate) fn begin_analysis(&mut self, ticker: TickerSymbol) -> Option<u64> {
        if self.loading.is_some() {
            return None;
        }
        self.analyze_generation += 1;
        let generation = self.analyze_generation;
        self.loading = Some(PendingAnalysis { ticker, generation });
        self.current_stock = None;
        self.search_input.clear();
        self.view = View::Analysis;
        Some(generation)
    }

    /// Applies an analyze outcome. Returns `false` when the call is no longer
    /// the pending one and the outcome was dropped.
    pub(crate) fn finish_analysis<E: std::fmt::Display>(
        &mut self,
        generation: u64,
        result: Result<AnalysisResult, E>,
    ) -> bool {
        let pending = match self.loading.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.loading = other;
                return false;
            }
        };

        match result {
            Ok(analysis) => {
                self.current_stock = Some(AnalyzedStock::new(pending.ticker, analysis));
                self.view = View::Analysis;
            }
            Err(err) => {
                tracing::error!(ticker = %pending.ticker, error = %err, "failed to analyze stock");
                self.view = View::Weekly;
                self.raise(
                    Severity::Destructive,
                    "Analysis Failed",
                    format!(
                        "Could not analyze stock \"{}\". Please try again.",
                        pending.ticker
                    ),
                );
            }
        }
        true
    }

    /// Returns to the list view. A pending analysis is abandoned; its result
    /// will be dropped when it arrives.
    pub(crate) fn back(&mut self) {
        self.loading = None;
        self.view = View::Weekly;
    }

    pub(crate) fn begin_explain(&mut self, ticker: TickerSymbol) -> u64 {
        self.explain_seq += 1;
        let id = self.explain_seq;
        Arc::make_mut(&mut self.explain_in_flight).insert(ticker, id);
        id
    }

    /// Applies an explain outcome. The last response to arrive wins; the
    /// in-flight flag clears only once the latest call for the ticker is done.
    pub(crate) fn finish_explain<E: std::fmt::Display>(
        &mut self,
        ticker: &TickerSymbol,
        id: u64,
        result: Result<String, E>,
    ) {
        if self.explain_in_flight.get(ticker) == Some(&id) {
            Arc::make_mut(&mut self.explain_in_flight).remove(ticker);
        }

        match result {
            Ok(rationale) => {
                let explanations = Arc::make_mut(&mut self.explanations);
                match explanations.iter_mut().find(|(t, _)| t == ticker) {
                    Some(entry) => entry.1 = rationale,
                    None => explanations.push((ticker.clone(), rationale)),
                }
            }
            Err(err) => {
                tracing::error!(%ticker, error = %err, "failed to explain rationale");
                self.raise(
                    Severity::Destructive,
                    "Error",
                    "Could not load detailed rationale.",
                );
            }
        }
    }
}
