use thiserror::Error;

/// Errors that can occur within the pin store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pin with the given ID exists in the store.
    #[error("Pin not found: {id}")]
    PinNotFound { id: i64 },

    /// A previous holder of the connection panicked mid-statement.
    #[error("Database connection lock poisoned")]
    LockPoisoned,

    /// The blocking task running the statement was cancelled or panicked.
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// An intake request that cannot become a [`crate::NewPin`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// `scheduledAt` was present but not an RFC 3339 timestamp.
    #[error("Invalid scheduledAt timestamp: {0}")]
    InvalidTimestamp(String),
}
