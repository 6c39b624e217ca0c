mod achievements;
mod engine;
mod pool;
mod state;
mod view;

// Public API of the quiz subsystem.
pub use crate::error::QuizError;
pub use achievements::{AchievementRule, AchievementTracker};
pub use engine::QuizEngine;
pub use pool::QuestionPool;
pub use state::{QuizProgress, QuizSnapshot, QuizState, QuizUpdate};
pub use view::{OptionHighlight, OptionView, QuestionView};
