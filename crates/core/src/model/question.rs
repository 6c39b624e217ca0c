use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{OptionKey, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: String },

    #[error("question {id} has no options")]
    NoOptions { id: String },

    #[error("question {id} repeats option key {key}")]
    DuplicateOptionKey { id: String, key: String },

    #[error("question {id} names correct option {key}, which is not among its options")]
    UnknownCorrectOption { id: String, key: String },
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// A single selectable answer, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub key: OptionKey,
    pub text: String,
}

/// Unvalidated question as it arrives from a question source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: String,
    pub prompt: String,
    pub options: Vec<(String, String)>,
    pub correct_option: String,
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or prompt is blank, there are no options,
    /// an option key repeats, or the correct key is not one of the options.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions { id });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        let mut options = Vec::with_capacity(self.options.len());
        for (key, text) in self.options {
            let key = key.trim().to_owned();
            if !seen.insert(key.clone()) {
                return Err(QuestionError::DuplicateOptionKey { id, key });
            }
            options.push(AnswerOption {
                key: OptionKey::new(key),
                text,
            });
        }

        let correct = self.correct_option.trim();
        if !seen.contains(correct) {
            return Err(QuestionError::UnknownCorrectOption {
                id,
                key: correct.to_owned(),
            });
        }

        let explanation = self
            .explanation
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(Question {
            id: QuestionId::new(id),
            prompt,
            options,
            correct_option: OptionKey::new(correct),
            explanation,
        })
    }
}

/// An immutable quiz question. Construct through `QuestionDraft::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_option: OptionKey,
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in their original order.
    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> &OptionKey {
        &self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, key: &OptionKey) -> bool {
        self.options.iter().any(|option| &option.key == key)
    }

    /// Grade `selected` against this question's correct option.
    #[must_use]
    pub fn grade(&self, selected: OptionKey) -> AnswerResult {
        let is_correct = selected == self.correct_option;
        AnswerResult {
            selected,
            correct: self.correct_option.clone(),
            is_correct,
        }
    }
}

/// Outcome of answering a question. Derived, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub selected: OptionKey,
    pub correct: OptionKey,
    pub is_correct: bool,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
