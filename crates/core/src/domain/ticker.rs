use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest ticker accepted from the search box.
pub const MAX_SEARCH_LEN: usize = 5;

/// Opaque stock identifier. Services only require it to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    Empty,
    TooLong { len: usize },
}

impl fmt::Display for TickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerError::Empty => f.write_str("Ticker is required."),
            TickerError::TooLong { .. } => f.write_str("Ticker is too long."),
        }
    }
}

impl std::error::Error for TickerError {}

impl TickerSymbol {
    pub fn new(raw: impl Into<String>) -> Result<Self, TickerError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TickerError::Empty);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Validates user input from the search box: non-empty, at most
    /// [`MAX_SEARCH_LEN`] characters, upper-cased.
    pub fn parse_search(raw: &str) -> Result<Self, TickerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TickerError::Empty);
        }
        let len = trimmed.chars().count();
        if len > MAX_SEARCH_LEN {
            return Err(TickerError::TooLong { len });
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_rejects_blank() {
        assert_eq!(TickerSymbol::new(" msft ").unwrap().as_str(), "msft");
        assert_eq!(TickerSymbol::new("   "), Err(TickerError::Empty));
    }

    #[test]
    fn parse_search_uppercases_and_limits_length() {
        assert_eq!(TickerSymbol::parse_search("aapl").unwrap().as_str(), "AAPL");
        assert_eq!(
            TickerSymbol::parse_search("ZZZZZZ"),
            Err(TickerError::TooLong { len: 6 })
        );
        assert_eq!(TickerSymbol::parse_search(""), Err(TickerError::Empty));
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        assert!(serde_json::from_str::<TickerSymbol>("\"\"").is_err());
        let t: TickerSymbol = serde_json::from_str("\"NVDA\"").unwrap();
        assert_eq!(t.as_str(), "NVDA");
    }
}
