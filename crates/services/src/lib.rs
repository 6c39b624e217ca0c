#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod quiz;
pub mod source;

pub use app_services::AppServices;
pub use config::{QuestionSourceConfig, QuizConfig};
pub use error::{AppServicesError, ConfigError, QuizError, SourceError};
pub use source::{FileQuizSource, HttpQuizSource, QuizSource, StaticQuizSource};

pub use quiz::{
    AchievementRule, AchievementTracker, OptionHighlight, OptionView, QuestionPool, QuestionView,
    QuizEngine, QuizProgress, QuizSnapshot, QuizState, QuizUpdate,
};
