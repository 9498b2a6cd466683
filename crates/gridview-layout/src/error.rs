use gridview_core::CardKey;
use thiserror::Error;

/// A card size query was rejected by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SizeQueryError {
    reason: String,
}

impl SizeQueryError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors raised while preparing or running a layout assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A card configuration has no layout key yet. Recovered by stamping keys.
    #[error("card {index} has no layout key")]
    MissingKey { index: usize },
    /// The size oracle rejected a card; the whole run is abandoned.
    #[error("size query failed for card {key}: {source}")]
    SizeQuery {
        key: CardKey,
        #[source]
        source: SizeQueryError,
    },
}
