use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use quiz_core::model::{
    AchievementEvent, BadgeCatalog, FIRST_QUESTION_INDEX, OptionKey, SessionState,
};
use storage::progress::ProgressRepository;
use storage::repository::{ProgressKey, ProgressStore, StorageError};

use super::achievements::{AchievementRule, AchievementTracker};
use super::pool::QuestionPool;
use super::state::{QuizProgress, QuizSnapshot, QuizState, QuizUpdate};
use crate::error::QuizError;
use crate::source::QuizSource;

/// Fall back to `default` when a persisted field cannot be decoded.
///
/// Only `StorageError::Serialization` is degraded; backend failures still propagate.
fn or_default<T>(
    key: ProgressKey,
    loaded: Result<Option<T>, StorageError>,
    default: T,
) -> Result<T, QuizError> {
    match loaded {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(default),
        Err(StorageError::Serialization(reason)) => {
            tracing::warn!(field = %key, %reason, "invalid persisted value; using default");
            Ok(default)
        }
        Err(err) => Err(err.into()),
    }
}

/// The quiz progression state machine.
///
/// Owns the question pool and achievement tracker and is the only writer of the
/// progress store. Operations take `&mut self`, so one caller drives it at a time.
pub struct QuizEngine {
    source: Arc<dyn QuizSource>,
    progress: ProgressRepository,
    pool: QuestionPool,
    tracker: AchievementTracker,
    session: SessionState,
    state: QuizState,
    subscriber: Option<mpsc::UnboundedSender<QuizUpdate>>,
}

impl QuizEngine {
    #[must_use]
    pub fn new(
        source: Arc<dyn QuizSource>,
        store: Arc<dyn ProgressStore>,
        catalog: Arc<BadgeCatalog>,
    ) -> Self {
        Self {
            source,
            progress: ProgressRepository::new(store),
            pool: QuestionPool::new(),
            tracker: AchievementTracker::new(catalog, AchievementRule::default()),
            session: SessionState::default(),
            state: QuizState::Loading,
            subscriber: None,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: AchievementRule) -> Self {
        let catalog = Arc::clone(self.tracker.catalog());
        self.tracker = AchievementTracker::new(catalog, rule);
        self
    }

    /// Replace the (empty) pool, e.g. with a seeded one for reproducible picks.
    #[must_use]
    pub fn with_pool(mut self, pool: QuestionPool) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.session.score()
    }

    #[must_use]
    pub fn question_index(&self) -> u32 {
        self.session.question_index()
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<BadgeCatalog> {
        self.tracker.catalog()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answered = self.session.answered();
        QuizProgress {
            question_index: self.session.question_index(),
            score: self.session.score(),
            answered: answered.len(),
            total: self.pool.len(),
            remaining: self.pool.remaining(&answered),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            state: self.state.clone(),
            progress: self.progress(),
        }
    }

    /// Receive every future `QuizUpdate`. A new subscription replaces the previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<QuizUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriber = Some(tx);
        rx
    }

    /// Fetch questions and restore the persisted session.
    ///
    /// On fetch failure nothing persisted is touched. If no question set was loaded yet
    /// the engine enters `LoadFailed`; otherwise the current state is kept.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::FetchFailed` when the source fails, or `QuizError::Storage`
    /// when the progress store cannot be read or written.
    pub async fn resume(&mut self) -> Result<QuizUpdate, QuizError> {
        let questions = match self.source.fetch_questions().await {
            Ok(questions) => questions,
            Err(err) => {
                tracing::warn!(error = %err, "question fetch failed");
                if !self.state.is_loaded() {
                    self.state = QuizState::LoadFailed {
                        reason: err.to_string(),
                    };
                    self.publish(None);
                }
                return Err(QuizError::FetchFailed(err));
            }
        };

        self.pool.load(questions);
        self.session = self.load_session().await?;
        self.tracker.clear();
        self.tracker.mark_owned_from_score(self.session.score());

        let restored = self
            .session
            .current_question()
            .and_then(|id| self.pool.get(id))
            .cloned();

        match restored {
            Some(question) => {
                let selected = self
                    .session
                    .selected_option()
                    .filter(|key| question.has_option(key))
                    .cloned();
                if selected.is_none() && self.session.selected_option().is_some() {
                    tracing::warn!(
                        question = %question.id(),
                        "persisted selection is not an option of the question; presenting it again"
                    );
                    self.session.present(question.id().clone());
                }
                if selected.is_some() && !self.session.is_answered(question.id()) {
                    let answered = self.session.answered_with(question.id());
                    self.progress.save_answered_ids(&answered).await?;
                    self.session.set_answered(answered);
                    tracing::warn!(
                        question = %question.id(),
                        "restored answered question was missing from the answered set"
                    );
                }
                self.state = match selected {
                    Some(key) => QuizState::Answered {
                        result: question.grade(key),
                        question,
                    },
                    None => QuizState::Presenting { question },
                };
            }
            None => self.present_next(false).await?,
        }

        tracing::info!(
            state = self.state.name(),
            index = self.session.question_index(),
            score = self.session.score(),
            "quiz resumed"
        );
        Ok(self.publish(None))
    }

    /// Answer the live question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::IllegalTransition` unless presenting, `QuizError::UnknownOption`
    /// if `key` is not one of the question's options, or `QuizError::Storage` if the
    /// answer cannot be persisted. State is unchanged on every error.
    pub async fn select_answer(&mut self, key: OptionKey) -> Result<QuizUpdate, QuizError> {
        let QuizState::Presenting { question } = &self.state else {
            return Err(self.reject("select_answer"));
        };
        let question = question.clone();
        if !question.has_option(&key) {
            return Err(QuizError::UnknownOption {
                question: question.id().clone(),
                key,
            });
        }

        let answered = self.session.answered_with(question.id());
        let result = question.grade(key.clone());
        let old_score = self.session.score();
        let new_score = if result.is_correct {
            old_score.saturating_add(1)
        } else {
            old_score
        };

        self.progress
            .save_answer(&answered, new_score, &key)
            .await?;

        self.session.set_answered(answered);
        self.session.set_score(new_score);
        self.session.select(key);
        let achievement = self.tracker.evaluate(old_score, new_score);

        tracing::debug!(
            question = %question.id(),
            correct = result.is_correct,
            score = new_score,
            "answer recorded"
        );
        self.state = QuizState::Answered { question, result };
        Ok(self.publish(achievement))
    }

    /// Move past an answered question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::IllegalTransition` unless answered, or `QuizError::Storage`
    /// if the move cannot be persisted.
    pub async fn continue_next(&mut self) -> Result<QuizUpdate, QuizError> {
        if !matches!(self.state, QuizState::Answered { .. }) {
            return Err(self.reject("continue_next"));
        }
        self.present_next(true).await?;
        Ok(self.publish(None))
    }

    /// Start a new cycle: clear persisted progress, owned badges, and the answered set.
    ///
    /// Before any question set is loaded only the progress is cleared; the next
    /// `resume` then starts from the first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the progress store cannot be written.
    pub async fn reset(&mut self) -> Result<QuizUpdate, QuizError> {
        self.progress.reset(FIRST_QUESTION_INDEX).await?;
        self.session = SessionState::default();
        self.tracker.clear();
        tracing::info!("quiz progress reset");

        if self.state.is_loaded() {
            self.present_next(false).await?;
        }
        Ok(self.publish(None))
    }

    async fn present_next(&mut self, advance: bool) -> Result<(), QuizError> {
        let answered = self.session.answered();
        let Some(next) = self.pool.pick_next(&answered) else {
            self.progress.save_finished().await?;
            self.session.finish();
            self.state = QuizState::Finished;
            tracing::info!(score = self.session.score(), "question pool exhausted");
            return Ok(());
        };

        if advance {
            let index = self.session.question_index().saturating_add(1);
            self.progress.save_advanced(index, next.id()).await?;
            self.session.advance_index();
        } else {
            self.progress.save_presented(next.id()).await?;
        }

        self.session.present(next.id().clone());
        self.state = QuizState::Presenting { question: next };
        Ok(())
    }

    async fn load_session(&self) -> Result<SessionState, QuizError> {
        let mut question_index = or_default(
            ProgressKey::QuestionIndex,
            self.progress.load_question_index().await,
            FIRST_QUESTION_INDEX,
        )?;
        if question_index < FIRST_QUESTION_INDEX {
            tracing::warn!(question_index, "persisted question index out of range; using 1");
            question_index = FIRST_QUESTION_INDEX;
        }

        let loaded_answered = self.progress.load_answered_ids().await;
        let answered_decoded = !matches!(loaded_answered, Err(StorageError::Serialization(_)));
        let answered = or_default(ProgressKey::AnsweredIds, loaded_answered, Default::default())?;

        let mut score = or_default(ProgressKey::Score, self.progress.load_score().await, 0)?;
        // Only a decoded answered set bounds the score.
        let max_score = u32::try_from(answered.len()).unwrap_or(u32::MAX);
        if answered_decoded && score > max_score {
            tracing::warn!(score, max_score, "persisted score exceeds answered count; clamping");
            score = max_score;
        }

        let current = or_default(
            ProgressKey::CurrentQuestionId,
            self.progress.load_current_question_id().await.map(Some),
            None,
        )?;
        let selected = or_default(
            ProgressKey::SelectedOptionKey,
            self.progress.load_selected_option().await.map(Some),
            None,
        )?;

        Ok(SessionState::from_persisted(
            question_index,
            score,
            answered,
            current,
            selected,
        ))
    }

    fn reject(&self, operation: &'static str) -> QuizError {
        let state = self.state.name();
        tracing::warn!(operation, state, "rejected illegal transition");
        QuizError::IllegalTransition { operation, state }
    }

    fn publish(&mut self, achievement: Option<AchievementEvent>) -> QuizUpdate {
        let update = QuizUpdate {
            snapshot: self.snapshot(),
            achievement,
        };
        if let Some(tx) = &self.subscriber {
            if tx.send(update.clone()).is_err() {
                tracing::debug!("update subscriber dropped");
                self.subscriber = None;
            }
        }
        update
    }
}

impl fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizEngine")
            .field("state", &self.state.name())
            .field("session", &self.session)
            .field("pool", &self.pool)
            .field("rule", &self.tracker.rule())
            .finish_non_exhaustive()
    }
}
