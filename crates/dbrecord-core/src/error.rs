//! Error taxonomy shared across the record layer and query engines.
//!
//! Validation and precondition failures are recoverable: operations return
//! them as `Err` values and the record keeps its state (and its `errors`
//! list) intact for inspection. Engine failures are propagated verbatim.
//! Configuration mistakes (an unknown relation name, an unregistered
//! relation target) are programming errors and panic instead.

use thiserror::Error;

/// Result alias used throughout DbRecord.
pub type Result<T> = std::result::Result<T, self::Error>;

/// Failures surfaced by record operations and query engines.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema validation rejected the candidate data. The offending
    /// record's `errors` list carries the per-field details.
    #[error("validation failed for `{table}`: {details}")]
    Validation {
        /// Backing table of the rejected record.
        table: String,
        /// Joined per-field failure descriptions.
        details: String,
    },

    /// `update`/`delete` was called on a record without a primary key
    /// value. Not recorded in the record's `errors` list.
    #[error("record has no primary key value")]
    MissingPrimaryKey,

    /// A registry lookup by name found nothing.
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// The query engine reported a storage failure.
    #[error("query engine error: {0}")]
    Engine(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an engine failure with the given message.
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine(message.into())
    }
}
