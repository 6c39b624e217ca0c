//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CatalogError, OptionKey, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by question sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("question source returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("question payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("question file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("question source is unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `QuizEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    /// Recoverable; persisted progress is untouched and `resume` may be retried.
    #[error("could not fetch questions: {0}")]
    FetchFailed(#[source] SourceError),
    /// The operation is not valid in the current state; nothing was changed.
    #[error("{operation} is not allowed while {state}")]
    IllegalTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("option {key} is not offered by question {question}")]
    UnknownOption { question: QuestionId, key: OptionKey },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid question source URL: {raw}")]
    InvalidSourceUrl { raw: String },
    #[error("invalid fetch timeout: {raw}")]
    InvalidTimeout { raw: String },
    #[error("unknown achievement rule: {raw} (expected `crossing` or `exact`)")]
    InvalidAchievementRule { raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("badge catalog could not be read: {0}")]
    CatalogIo(#[from] std::io::Error),
}
