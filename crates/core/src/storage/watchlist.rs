use crate::domain::ticker::TickerSymbol;
use crate::storage::{KeyValueStore, PersistenceWarning};
use serde::Serialize;

pub const WATCHLIST_KEY: &str = "watchlist";

/// Tickers the user starred, in the order they were added. Each appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    tickers: Vec<TickerSymbol>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `ticker`. Returns whether it is watched afterwards.
    pub fn toggle(&mut self, ticker: TickerSymbol) -> bool {
        if let Some(pos) = self.tickers.iter().position(|t| *t == ticker) {
            self.tickers.remove(pos);
            false
        } else {
            self.tickers.push(ticker);
            true
        }
    }

    pub fn contains(&self, ticker: &TickerSymbol) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerSymbol> {
        self.tickers.iter()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Reads the persisted watchlist. Missing, unreadable or corrupt data
    /// yields an empty list.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(WATCHLIST_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(warning) => {
                tracing::warn!(%warning, "failed to load watchlist");
                return Self::new();
            }
        };

        match Self::decode(&raw) {
            Ok(watchlist) => watchlist,
            Err(warning) => {
                tracing::warn!(%warning, "failed to load watchlist");
                Self::new()
            }
        }
    }

    /// Writes the watchlist back. Failures are logged and swallowed.
    pub fn persist(&self, store: &dyn KeyValueStore) {
        let result = serde_json::to_string(&self.tickers)
            .map_err(|e| PersistenceWarning::new(WATCHLIST_KEY, e.to_string()))
            .and_then(|body| store.set(WATCHLIST_KEY, &body));
        if let Err(warning) = result {
            tracing::warn!(%warning, "failed to save watchlist");
        }
    }

    fn decode(raw: &str) -> Result<Self, PersistenceWarning> {
        let entries: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| PersistenceWarning::new(WATCHLIST_KEY, format!("corrupt watchlist: {e}")))?;

        let mut out = Self::new();
        for entry in entries {
            match TickerSymbol::new(entry) {
                Ok(ticker) if !out.contains(&ticker) => out.tickers.push(ticker),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "skipping invalid watchlist entry"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn t(s: &str) -> TickerSymbol {
        TickerSymbol::new(s).unwrap()
    }

    #[test]
    fn toggle_twice_restores_contents_and_order() {
        let mut watchlist = Watchlist::new();
        watchlist.toggle(t("AAPL"));
        watchlist.toggle(t("MSFT"));
        watchlist.toggle(t("NVDA"));
        let before = watchlist.clone();

        assert!(watchlist.toggle(t("TSLA")));
        assert!(!watchlist.toggle(t("TSLA")));
        assert_eq!(watchlist, before);
    }

    #[test]
    fn re_adding_a_removed_ticker_appends_it() {
        let mut watchlist = Watchlist::new();
        watchlist.toggle(t("AAPL"));
        watchlist.toggle(t("MSFT"));
        watchlist.toggle(t("NVDA"));

        assert!(!watchlist.toggle(t("MSFT")));
        assert!(watchlist.toggle(t("MSFT")));
        let tickers: Vec<&str> = watchlist.iter().map(|t| t.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "NVDA", "MSFT"]);
    }

    #[test]
    fn ticker_is_held_at_most_once() {
        let mut watchlist = Watchlist::new();
        watchlist.toggle(t("AAPL"));
        assert!(watchlist.contains(&t("AAPL")));
        watchlist.toggle(t("AAPL"));
        assert!(watchlist.is_empty());
    }

    #[test]
    fn persists_as_json_list_under_watchlist_key() {
        let store = MemoryStore::new();
        let mut watchlist = Watchlist::new();
        watchlist.toggle(t("AAPL"));
        watchlist.toggle(t("MSFT"));
        watchlist.persist(&store);

        assert_eq!(
            store.get(WATCHLIST_KEY).unwrap().as_deref(),
            Some("[\"AAPL\",\"MSFT\"]")
        );
        assert_eq!(Watchlist::load(&store), watchlist);
    }

    #[test]
    fn corrupt_or_missing_data_loads_empty() {
        let store = MemoryStore::new();
        assert!(Watchlist::load(&store).is_empty());

        store.set(WATCHLIST_KEY, "{not a list").unwrap();
        assert!(Watchlist::load(&store).is_empty());
    }

    #[test]
    fn load_drops_blank_and_duplicate_entries() {
        let store = MemoryStore::new();
        store.set(WATCHLIST_KEY, "[\"AAPL\", \"\", \"AAPL\", \"MSFT\"]").unwrap();
        let watchlist = Watchlist::load(&store);
        let tickers: Vec<&str> = watchlist.iter().map(|t| t.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
    }
}
