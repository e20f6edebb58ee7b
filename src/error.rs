//! Error types surfaced by the store.

use thiserror::Error;

/// Errors produced by store operations.
///
/// Lost races on conditional state updates are *not* errors — they are
/// reported through zero row counts and `Option`/`bool` return values.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with an existing identity.
    #[error("{kind} already exists: {name}")]
    ObjectAlreadyExists { kind: &'static str, name: String },

    /// A calendar delete was attempted while triggers still reference it.
    #[error("calendar '{0}' is referenced by one or more triggers")]
    CalendarInUse(String),

    /// A job-data map violated the constraints of the configured codec mode.
    #[error("job data codec: {0}")]
    Codec(String),

    /// A job class name could not be resolved by the configured resolver.
    #[error("unknown job class: {0}")]
    ClassLoad(String),

    /// Generic database failure; wraps the underlying driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persistence-level constraint failed outside the database driver,
    /// e.g. a trigger referencing a job that does not exist.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub(crate) fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::ObjectAlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
