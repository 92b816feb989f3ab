//! Error types for live bindings.

use crate::types::RecordId;
use thiserror::Error;

/// Errors reported by a [`CollectionSource`](crate::source::CollectionSource).
///
/// These describe what went wrong at the transport boundary. Bindings wrap
/// them in a [`BindingError`] naming the stage that failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("subscription refused: {0}")]
    Refused(String),

    #[error("source closed")]
    Closed,
}

/// Main error type for binding operations.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Initial, reload or page-navigation fetch failed.
    #[error("fetch from '{collection}' failed: {source}")]
    Fetch {
        collection: String,
        #[source]
        source: SourceError,
    },

    /// Re-fetch for expansion failed while handling a change event.
    #[error("expansion re-fetch of {id} failed: {source}")]
    Expansion {
        id: RecordId,
        #[source]
        source: SourceError,
    },

    /// The live stream could not be established.
    #[error("subscription to '{collection}' could not be acquired: {source}")]
    SubscriptionAcquire {
        collection: String,
        #[source]
        source: SourceError,
    },

    #[error("invalid binding configuration: {0}")]
    InvalidConfig(String),
}

impl BindingError {
    /// The transport error underneath, if any.
    pub fn source_error(&self) -> Option<&SourceError> {
        match self {
            BindingError::Fetch { source, .. }
            | BindingError::Expansion { source, .. }
            | BindingError::SubscriptionAcquire { source, .. } => Some(source),
            BindingError::InvalidConfig(_) => None,
        }
    }

    /// True when the failure was a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self.source_error(), Some(SourceError::NotFound(_)))
    }
}

/// Result type for transport operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;
