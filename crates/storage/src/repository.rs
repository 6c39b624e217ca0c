use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The logical entries of persisted quiz progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgressKey {
    QuestionIndex,
    CurrentQuestionId,
    AnsweredIds,
    SelectedOptionKey,
    Score,
}

impl ProgressKey {
    pub const ALL: [ProgressKey; 5] = [
        ProgressKey::QuestionIndex,
        ProgressKey::CurrentQuestionId,
        ProgressKey::AnsweredIds,
        ProgressKey::SelectedOptionKey,
        ProgressKey::Score,
    ];

    /// Storage key. Must stay stable across releases.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressKey::QuestionIndex => "question_index",
            ProgressKey::CurrentQuestionId => "current_question_id",
            ProgressKey::AnsweredIds => "answered_ids",
            ProgressKey::SelectedOptionKey => "selected_option_key",
            ProgressKey::Score => "score",
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single write: `None` removes the entry so the next read sees the default.
pub type ProgressEntry = (ProgressKey, Option<String>);

/// Raw key-value contract backing quiz progress.
///
/// Values are opaque strings here; encoding lives in `progress::ProgressRepository`.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: ProgressKey) -> Result<Option<String>, StorageError>;

    /// Write (or remove, for `None`) a single entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put(&self, key: ProgressKey, value: Option<String>) -> Result<(), StorageError>;

    /// Write several entries so that either all of them or none become visible.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be committed.
    async fn put_many(&self, entries: &[ProgressEntry]) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    entries: Arc<Mutex<HashMap<ProgressKey, String>>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of entries currently held.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Debug for InMemoryProgressStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryProgressStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get(&self, key: ProgressKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    async fn put(&self, key: ProgressKey, value: Option<String>) -> Result<(), StorageError> {
        self.put_many(&[(key, value)]).await
    }

    async fn put_many(&self, entries: &[ProgressEntry]) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for (key, value) in entries {
            match value {
                Some(value) => {
                    guard.insert(*key, value.clone());
                }
                None => {
                    guard.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// Bundles the progress store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::new());
        Self { progress }
    }
}
