use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Malformed record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures of the day-scoring operations.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Participants must be defined for the current day")]
    MissingParticipants,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store failure: {0}")]
    Store(#[from] StorageError),
}

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;

impl ScoringError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Maps a store-level `NotFound` (an update hitting a missing document) to
    /// the scoring error naming the missing entity.
    pub(crate) fn missing(what: impl Into<String>) -> impl FnOnce(StorageError) -> Self {
        let what = what.into();
        move |error| match error {
            StorageError::NotFound => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}
