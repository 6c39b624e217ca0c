use std::collections::BTreeSet;
use std::sync::Arc;

use quiz_core::model::{OptionKey, QuestionId};

use crate::repository::{ProgressKey, ProgressStore, StorageError};

fn ser<E: core::fmt::Display>(key: ProgressKey, e: E) -> StorageError {
    StorageError::Serialization(format!("{key}: {e}"))
}

fn decode_u32(key: ProgressKey, raw: &str) -> Result<u32, StorageError> {
    raw.trim().parse::<u32>().map_err(|e| ser(key, e))
}

fn decode_answered(raw: &str) -> Result<BTreeSet<QuestionId>, StorageError> {
    let ids: Vec<String> =
        serde_json::from_str(raw).map_err(|e| ser(ProgressKey::AnsweredIds, e))?;
    ids.iter()
        .map(|id| id.parse::<QuestionId>().map_err(|e| ser(ProgressKey::AnsweredIds, e)))
        .collect()
}

fn encode_answered(ids: &BTreeSet<QuestionId>) -> Result<String, StorageError> {
    let raw: Vec<&str> = ids.iter().map(QuestionId::as_str).collect();
    serde_json::to_string(&raw).map_err(|e| ser(ProgressKey::AnsweredIds, e))
}

/// Typed view over a `ProgressStore`.
///
/// Loads return `Ok(None)` for entries that were never written and
/// `StorageError::Serialization` for entries that cannot be decoded, so callers can
/// fall back to a default for that field alone.
#[derive(Clone)]
pub struct ProgressRepository {
    store: Arc<dyn ProgressStore>,
}

impl ProgressRepository {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value is not a non-negative integer.
    pub async fn load_question_index(&self) -> Result<Option<u32>, StorageError> {
        let key = ProgressKey::QuestionIndex;
        self.store
            .get(key)
            .await?
            .map(|raw| decode_u32(key, &raw))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value is not a non-negative integer.
    pub async fn load_score(&self) -> Result<Option<u32>, StorageError> {
        let key = ProgressKey::Score;
        self.store
            .get(key)
            .await?
            .map(|raw| decode_u32(key, &raw))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored id is blank.
    pub async fn load_current_question_id(&self) -> Result<Option<QuestionId>, StorageError> {
        let key = ProgressKey::CurrentQuestionId;
        self.store
            .get(key)
            .await?
            .map(|raw| raw.parse::<QuestionId>().map_err(|e| ser(key, e)))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored set is not a JSON array of ids.
    pub async fn load_answered_ids(&self) -> Result<Option<BTreeSet<QuestionId>>, StorageError> {
        self.store
            .get(ProgressKey::AnsweredIds)
            .await?
            .map(|raw| decode_answered(&raw))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored key is blank.
    pub async fn load_selected_option(&self) -> Result<Option<OptionKey>, StorageError> {
        let key = ProgressKey::SelectedOptionKey;
        self.store
            .get(key)
            .await?
            .map(|raw| raw.parse::<OptionKey>().map_err(|e| ser(key, e)))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn save_answered_ids(&self, ids: &BTreeSet<QuestionId>) -> Result<(), StorageError> {
        self.store
            .put(ProgressKey::AnsweredIds, Some(encode_answered(ids)?))
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn save_score(&self, score: u32) -> Result<(), StorageError> {
        self.store
            .put(ProgressKey::Score, Some(score.to_string()))
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn save_selected_option(&self, key: Option<&OptionKey>) -> Result<(), StorageError> {
        self.store
            .put(
                ProgressKey::SelectedOptionKey,
                key.map(|k| k.as_str().to_owned()),
            )
            .await
    }

    /// Persist an answer in one batch, answered set first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch fails.
    pub async fn save_answer(
        &self,
        answered: &BTreeSet<QuestionId>,
        score: u32,
        selected: &OptionKey,
    ) -> Result<(), StorageError> {
        self.store
            .put_many(&[
                (ProgressKey::AnsweredIds, Some(encode_answered(answered)?)),
                (ProgressKey::Score, Some(score.to_string())),
                (
                    ProgressKey::SelectedOptionKey,
                    Some(selected.as_str().to_owned()),
                ),
            ])
            .await
    }

    /// Clear the live question once the pool is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch fails.
    pub async fn save_finished(&self) -> Result<(), StorageError> {
        self.store
            .put_many(&[
                (ProgressKey::CurrentQuestionId, None),
                (ProgressKey::SelectedOptionKey, None),
            ])
            .await
    }

    /// Persist `current` as the live question with no selection, keeping the index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch fails.
    pub async fn save_presented(&self, current: &QuestionId) -> Result<(), StorageError> {
        self.store
            .put_many(&[
                (
                    ProgressKey::CurrentQuestionId,
                    Some(current.as_str().to_owned()),
                ),
                (ProgressKey::SelectedOptionKey, None),
            ])
            .await
    }

    /// Persist a move to the next question: new index, new live question, no selection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch fails.
    pub async fn save_advanced(
        &self,
        question_index: u32,
        current: &QuestionId,
    ) -> Result<(), StorageError> {
        self.store
            .put_many(&[
                (ProgressKey::QuestionIndex, Some(question_index.to_string())),
                (
                    ProgressKey::CurrentQuestionId,
                    Some(current.as_str().to_owned()),
                ),
                (ProgressKey::SelectedOptionKey, None),
            ])
            .await
    }

    /// Return every entry to its default in one batch.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch fails.
    pub async fn reset(&self, first_index: u32) -> Result<(), StorageError> {
        self.store
            .put_many(&[
                (ProgressKey::QuestionIndex, Some(first_index.to_string())),
                (ProgressKey::CurrentQuestionId, None),
                (ProgressKey::AnsweredIds, None),
                (ProgressKey::SelectedOptionKey, None),
                (ProgressKey::Score, None),
            ])
            .await
    }
}
