pub mod contract;
pub mod recommendation;
pub mod ticker;

pub use recommendation::{DisplayCategory, ExplainKind, Recommendation};
pub use ticker::{TickerError, TickerSymbol};
