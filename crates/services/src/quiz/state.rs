use quiz_core::model::{AchievementEvent, AnswerResult, Question};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    /// No question set loaded yet.
    Loading,
    /// The last fetch failed before any question set was loaded; `resume` may be retried.
    LoadFailed { reason: String },
    Presenting { question: Question },
    Answered {
        question: Question,
        result: AnswerResult,
    },
    /// The pool is exhausted. Only `reset` leaves this state.
    Finished,
}

impl QuizState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QuizState::Loading => "loading",
            QuizState::LoadFailed { .. } => "load-failed",
            QuizState::Presenting { .. } => "presenting",
            QuizState::Answered { .. } => "answered",
            QuizState::Finished => "finished",
        }
    }

    /// True once a question set has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !matches!(self, QuizState::Loading | QuizState::LoadFailed { .. })
    }

    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        match self {
            QuizState::Presenting { question } | QuizState::Answered { question, .. } => {
                Some(question)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn answer(&self) -> Option<&AnswerResult> {
        match self {
            QuizState::Answered { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Counters for a progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub question_index: u32,
    pub score: u32,
    pub answered: usize,
    pub total: usize,
    pub remaining: usize,
}

/// Everything a caller needs to render the quiz after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSnapshot {
    pub state: QuizState,
    pub progress: QuizProgress,
}

/// Published after every operation. `achievement` is delivered once and never repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizUpdate {
    pub snapshot: QuizSnapshot,
    pub achievement: Option<AchievementEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_states_are_not_loaded() {
        assert!(!QuizState::Loading.is_loaded());
        assert!(
            !QuizState::LoadFailed {
                reason: "offline".into()
            }
            .is_loaded()
        );
        assert!(QuizState::Finished.is_loaded());
        assert!(QuizState::Finished.question().is_none());
    }
}
