mod badge;
mod catalog;
mod ids;
mod question;
mod session;

pub use ids::{BadgeId, OptionKey, ParseIdError, QuestionId};

pub use badge::{AchievementEvent, Badge, BadgeCategory};
pub use catalog::{BadgeCatalog, BadgeStatus, CatalogError};
pub use question::{AnswerOption, AnswerResult, Question, QuestionDraft, QuestionError};
pub use session::{FIRST_QUESTION_INDEX, SessionState};
