use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::ids::{OptionKey, QuestionId};

/// First question number of a fresh cycle.
pub const FIRST_QUESTION_INDEX: u32 = 1;

/// In-memory progression state, mirrored to the progress store.
///
/// The answered set is shared as an immutable snapshot; every change replaces
/// the whole `Arc` so readers never observe a set mutating under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    question_index: u32,
    score: u32,
    answered: Arc<BTreeSet<QuestionId>>,
    current_question: Option<QuestionId>,
    selected_option: Option<OptionKey>,
    finished: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            question_index: FIRST_QUESTION_INDEX,
            score: 0,
            answered: Arc::new(BTreeSet::new()),
            current_question: None,
            selected_option: None,
            finished: false,
        }
    }
}

impl SessionState {
    /// Rehydrate state from already-sanitised persisted values.
    ///
    /// A `question_index` of zero is lifted to `FIRST_QUESTION_INDEX`.
    #[must_use]
    pub fn from_persisted(
        question_index: u32,
        score: u32,
        answered: BTreeSet<QuestionId>,
        current_question: Option<QuestionId>,
        selected_option: Option<OptionKey>,
    ) -> Self {
        Self {
            question_index: question_index.max(FIRST_QUESTION_INDEX),
            score,
            answered: Arc::new(answered),
            current_question,
            selected_option,
            finished: false,
        }
    }

    #[must_use]
    pub fn question_index(&self) -> u32 {
        self.question_index
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Snapshot of the answered set. Cheap to clone and never mutated in place.
    #[must_use]
    pub fn answered(&self) -> Arc<BTreeSet<QuestionId>> {
        Arc::clone(&self.answered)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    #[must_use]
    pub fn is_answered(&self, id: &QuestionId) -> bool {
        self.answered.contains(id)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionId> {
        self.current_question.as_ref()
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&OptionKey> {
        self.selected_option.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the answered set with `id` added, leaving `self` untouched.
    #[must_use]
    pub fn answered_with(&self, id: &QuestionId) -> BTreeSet<QuestionId> {
        let mut next = (*self.answered).clone();
        next.insert(id.clone());
        next
    }

    pub fn set_answered(&mut self, answered: BTreeSet<QuestionId>) {
        self.answered = Arc::new(answered);
    }

    pub fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    /// Advance the question counter by exactly one.
    pub fn advance_index(&mut self) {
        self.question_index = self.question_index.saturating_add(1);
    }

    /// Make `id` the live question with no selection yet.
    pub fn present(&mut self, id: QuestionId) {
        self.current_question = Some(id);
        self.selected_option = None;
        self.finished = false;
    }

    pub fn select(&mut self, key: OptionKey) {
        self.selected_option = Some(key);
    }

    pub fn finish(&mut self) {
        self.current_question = None;
        self.selected_option = None;
        self.finished = true;
    }
}
