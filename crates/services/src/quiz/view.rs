use quiz_core::model::{OptionKey, QuestionId};

use super::state::QuizState;

/// How an option should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionHighlight {
    Neutral,
    SelectedCorrect,
    SelectedIncorrect,
    /// The correct option, shown after a wrong pick.
    RevealedCorrect,
}

/// Presentation-agnostic option row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub key: OptionKey,
    pub text: String,
    pub enabled: bool,
    pub highlight: OptionHighlight,
}

/// Presentation-agnostic view of the live question.
///
/// No formatting or localisation happens here; the UI owns that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub answered: bool,
    pub explanation: Option<String>,
}

impl QuestionView {
    /// Build the view for the live question, if there is one.
    #[must_use]
    pub fn from_state(state: &QuizState) -> Option<Self> {
        let question = state.question()?;
        let result = state.answer();

        let options = question
            .options()
            .iter()
            .map(|option| {
                let highlight = match result {
                    None => OptionHighlight::Neutral,
                    Some(result) if result.selected == option.key => {
                        if result.is_correct {
                            OptionHighlight::SelectedCorrect
                        } else {
                            OptionHighlight::SelectedIncorrect
                        }
                    }
                    Some(result) if result.correct == option.key => {
                        OptionHighlight::RevealedCorrect
                    }
                    Some(_) => OptionHighlight::Neutral,
                };
                OptionView {
                    key: option.key.clone(),
                    text: option.text.clone(),
                    enabled: result.is_none(),
                    highlight,
                }
            })
            .collect();

        Some(Self {
            id: question.id().clone(),
            prompt: question.prompt().to_owned(),
            options,
            answered: result.is_some(),
            explanation: result
                .and_then(|_| question.explanation())
                .map(str::to_owned),
        })
    }
}
