use thiserror::Error;

/// Errors surfaced by request execution.
///
/// The request layer never recovers from these; they reach the caller
/// exactly as the storage collaborator reported them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The filter references something the store cannot translate.
    #[error("malformed filter on {collection}: {reason}")]
    MalformedFilter { collection: String, reason: String },

    /// The store cannot be reached or has been closed.
    #[error("persistent store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected a create or update.
    #[error("unique key conflict on {collection}: {key}")]
    Conflict { collection: String, key: String },

    /// The update was cancelled before it committed.
    #[error("update cancelled before commit")]
    Cancelled,

    /// A modifier panicked; nothing from the update was committed.
    #[error("modifier panicked: {0}")]
    ModifierPanicked(String),

    /// A blocking wait was attempted on an async runtime thread.
    #[error("blocking wait called from within an async runtime")]
    BlockingInRuntime,

    #[error("entity serialization error: {0}")]
    Serde(String),

    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e.to_string())
    }
}
