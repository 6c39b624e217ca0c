use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use quiz_core::model::{BadgeCatalog, OptionKey, Question, QuestionDraft, QuestionId};
use services::{
    AchievementRule, OptionHighlight, QuestionPool, QuestionView, QuizEngine, QuizError,
    QuizSource, QuizState, SourceError, StaticQuizSource,
};
use storage::repository::{InMemoryProgressStore, ProgressKey, ProgressStore};

fn question(id: &str, correct: &str) -> Question {
    QuestionDraft {
        id: id.into(),
        prompt: format!("Prompt for {id}"),
        options: vec![
            ("A".into(), "first".into()),
            ("B".into(), "second".into()),
            ("C".into(), "third".into()),
        ],
        correct_option: correct.into(),
        explanation: Some(format!("Because {correct}.")),
    }
    .validate()
    .unwrap()
}

fn questions(n: usize) -> Vec<Question> {
    (1..=n).map(|i| question(&format!("q{i}"), "A")).collect()
}

fn engine_over(source: Arc<dyn QuizSource>, store: &InMemoryProgressStore, seed: u64) -> QuizEngine {
    QuizEngine::new(
        source,
        Arc::new(store.clone()),
        Arc::new(BadgeCatalog::embedded().unwrap()),
    )
    .with_pool(QuestionPool::with_seed(seed))
}

fn engine(pool: Vec<Question>, store: &InMemoryProgressStore, seed: u64) -> QuizEngine {
    engine_over(Arc::new(StaticQuizSource::new(pool)), store, seed)
}

fn current_id(engine: &QuizEngine) -> QuestionId {
    engine.state().question().unwrap().id().clone()
}

fn correct_key(engine: &QuizEngine) -> OptionKey {
    engine.state().question().unwrap().correct_option().clone()
}

/// Fails until `recover` is called, then serves `questions`.
struct FlakySource {
    healthy: AtomicBool,
    questions: Vec<Question>,
}

impl FlakySource {
    fn new(questions: Vec<Question>) -> Self {
        Self {
            healthy: AtomicBool::new(false),
            questions,
        }
    }

    fn recover(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuizSource for FlakySource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(self.questions.clone())
        } else {
            Err(SourceError::Unavailable("offline".into()))
        }
    }
}

#[tokio::test]
async fn two_question_walkthrough() {
    let store = InMemoryProgressStore::new();
    store
        .put(ProgressKey::CurrentQuestionId, Some("q1".into()))
        .await
        .unwrap();
    let mut engine = engine(vec![question("q1", "A"), question("q2", "B")], &store, 7);

    engine.resume().await.unwrap();
    assert_eq!(current_id(&engine), QuestionId::new("q1"));

    let update = engine.select_answer(OptionKey::new("A")).await.unwrap();
    assert_eq!(update.snapshot.progress.score, 1);
    assert!(update.snapshot.state.answer().unwrap().is_correct);

    engine.continue_next().await.unwrap();
    assert_eq!(current_id(&engine), QuestionId::new("q2"));
    assert_eq!(engine.question_index(), 2);

    let update = engine.select_answer(OptionKey::new("C")).await.unwrap();
    let result = update.snapshot.state.answer().unwrap();
    assert!(!result.is_correct);
    assert_eq!(result.correct, OptionKey::new("B"));
    assert_eq!(update.snapshot.progress.score, 1);

    let update = engine.continue_next().await.unwrap();
    assert_eq!(update.snapshot.state, QuizState::Finished);
    assert_eq!(update.snapshot.progress.remaining, 0);
}

#[tokio::test]
async fn no_question_is_repeated_within_a_cycle() {
    let store = InMemoryProgressStore::new();
    let mut engine = engine(questions(12), &store, 42);
    engine.resume().await.unwrap();

    let mut seen = BTreeSet::new();
    let mut advances = 0;
    assert_eq!(engine.question_index(), 1);
    while !matches!(engine.state(), QuizState::Finished) {
        assert!(seen.insert(current_id(&engine)), "question repeated");
        engine.select_answer(OptionKey::new("B")).await.unwrap();
        engine.continue_next().await.unwrap();
        if matches!(engine.state(), QuizState::Presenting { .. }) {
            advances += 1;
        }
        assert_eq!(engine.question_index(), 1 + advances);
    }

    assert_eq!(advances, 11);
    assert_eq!(engine.question_index(), 12);
    assert_eq!(seen.len(), 12);
    assert_eq!(engine.session().answered_count(), 12);
    assert_eq!(engine.score(), 0);
}

#[tokio::test]
async fn score_counts_only_correct_answers() {
    let store = InMemoryProgressStore::new();
    let mut engine = engine(questions(6), &store, 1);
    engine.resume().await.unwrap();

    for round in 0..6 {
        let key = if round % 2 == 0 {
            correct_key(&engine)
        } else {
            OptionKey::new("C")
        };
        engine.select_answer(key).await.unwrap();
        engine.continue_next().await.unwrap();
    }
    assert_eq!(engine.score(), 3);
    assert!(engine.score() as usize <= engine.session().answered_count());
}

#[tokio::test]
async fn resume_restores_an_answered_question() {
    let store = InMemoryProgressStore::new();
    let mut first = engine(questions(4), &store, 9);
    first.resume().await.unwrap();
    first.select_answer(OptionKey::new("A")).await.unwrap();
    let answered_id = current_id(&first);

    let mut second = engine(questions(4), &store, 10);
    second.resume().await.unwrap();

    assert_eq!(current_id(&second), answered_id);
    let result = second.state().answer().unwrap();
    assert_eq!(result.selected, OptionKey::new("A"));
    assert!(result.is_correct);
    assert_eq!(second.score(), 1);

    let view = QuestionView::from_state(second.state()).unwrap();
    assert!(view.options.iter().all(|option| !option.enabled));
    assert_eq!(view.options[0].highlight, OptionHighlight::SelectedCorrect);
}

#[tokio::test]
async fn resume_restores_a_presented_question_and_index() {
    let store = InMemoryProgressStore::new();
    let mut first = engine(questions(5), &store, 3);
    first.resume().await.unwrap();
    first.select_answer(OptionKey::new("B")).await.unwrap();
    first.continue_next().await.unwrap();
    let presented = current_id(&first);

    let mut second = engine(questions(5), &store, 4);
    second.resume().await.unwrap();

    assert!(matches!(second.state(), QuizState::Presenting { .. }));
    assert_eq!(current_id(&second), presented);
    assert_eq!(second.question_index(), 2);
    assert_eq!(second.session().answered_count(), 1);
}

#[tokio::test]
async fn owned_badges_do_not_refire_after_resume() {
    let store = InMemoryProgressStore::new();
    let answered: Vec<String> = (1..=5).map(|i| format!("q{i}")).collect();
    store
        .put_many(&[
            (ProgressKey::Score, Some("5".into())),
            (
                ProgressKey::AnsweredIds,
                Some(serde_json::to_string(&answered).unwrap()),
            ),
        ])
        .await
        .unwrap();

    let mut engine = engine(questions(8), &store, 5);
    engine.resume().await.unwrap();
    assert_eq!(engine.score(), 5);

    let update = engine.select_answer(correct_key(&engine)).await.unwrap();
    assert_eq!(update.snapshot.progress.score, 6);
    assert_eq!(update.achievement, None);
}

#[tokio::test]
async fn first_correct_answer_earns_the_first_badge_once() {
    let store = InMemoryProgressStore::new();
    let mut engine = engine(questions(3), &store, 8).with_rule(AchievementRule::ExactMin);
    engine.resume().await.unwrap();

    let update = engine.select_answer(correct_key(&engine)).await.unwrap();
    let event = update.achievement.unwrap();
    assert_eq!(event.badge_id.as_str(), "badge_milk_tooth");
    assert_eq!(event.badge_icon, "badge1");

    engine.continue_next().await.unwrap();
    let update = engine.select_answer(correct_key(&engine)).await.unwrap();
    assert_eq!(update.achievement, None);
}

#[tokio::test]
async fn malformed_persisted_fields_fall_back_to_defaults() {
    let store = InMemoryProgressStore::new();
    store
        .put_many(&[
            (ProgressKey::QuestionIndex, Some("zero".into())),
            (ProgressKey::Score, Some("-4".into())),
            (ProgressKey::AnsweredIds, Some("not json".into())),
            (ProgressKey::CurrentQuestionId, Some("q404".into())),
            (ProgressKey::SelectedOptionKey, Some("Z".into())),
        ])
        .await
        .unwrap();

    let mut engine = engine(questions(3), &store, 2);
    let update = engine.resume().await.unwrap();

    assert!(matches!(update.snapshot.state, QuizState::Presenting { .. }));
    assert_eq!(update.snapshot.progress.question_index, 1);
    assert_eq!(update.snapshot.progress.score, 0);
    assert_eq!(update.snapshot.progress.answered, 0);
    assert_eq!(update.snapshot.progress.remaining, 3);
}

#[tokio::test]
async fn score_above_answered_count_is_clamped() {
    let store = InMemoryProgressStore::new();
    store
        .put_many(&[
            (ProgressKey::Score, Some("9".into())),
            (ProgressKey::AnsweredIds, Some(r#"["q1","q2"]"#.into())),
        ])
        .await
        .unwrap();

    let mut engine = engine(questions(4), &store, 2);
    engine.resume().await.unwrap();
    assert_eq!(engine.score(), 2);
}

#[tokio::test]
async fn corrupt_answered_set_keeps_a_valid_score() {
    let store = InMemoryProgressStore::new();
    store
        .put_many(&[
            (ProgressKey::Score, Some("5".into())),
            (ProgressKey::AnsweredIds, Some("not json".into())),
        ])
        .await
        .unwrap();

    let mut engine = engine(questions(8), &store, 5);
    engine.resume().await.unwrap();
    assert_eq!(engine.score(), 5);
    assert_eq!(engine.session().answered_count(), 0);

    let update = engine.select_answer(correct_key(&engine)).await.unwrap();
    assert_eq!(update.snapshot.progress.score, 6);
    assert_eq!(update.achievement, None);
}

#[tokio::test]
async fn restored_answer_rejoins_the_answered_set() {
    let store = InMemoryProgressStore::new();
    store
        .put_many(&[
            (ProgressKey::CurrentQuestionId, Some("q1".into())),
            (ProgressKey::SelectedOptionKey, Some("A".into())),
            (ProgressKey::AnsweredIds, Some("{broken".into())),
        ])
        .await
        .unwrap();

    let mut engine = engine(questions(3), &store, 14);
    engine.resume().await.unwrap();
    assert!(matches!(engine.state(), QuizState::Answered { .. }));
    assert!(engine.session().is_answered(&QuestionId::new("q1")));
    assert_eq!(
        store.get(ProgressKey::AnsweredIds).await.unwrap().as_deref(),
        Some(r#"["q1"]"#)
    );

    while !matches!(engine.state(), QuizState::Finished) {
        engine.continue_next().await.unwrap();
        if matches!(engine.state(), QuizState::Presenting { .. }) {
            assert_ne!(current_id(&engine), QuestionId::new("q1"));
            engine.select_answer(OptionKey::new("A")).await.unwrap();
        }
    }
    assert_eq!(engine.session().answered_count(), 3);
}

#[tokio::test]
async fn fetch_failure_is_recoverable_and_leaves_progress_alone() {
    let store = InMemoryProgressStore::new();
    store
        .put_many(&[
            (ProgressKey::QuestionIndex, Some("3".into())),
            (ProgressKey::Score, Some("1".into())),
            (ProgressKey::AnsweredIds, Some(r#"["q1","q2"]"#.into())),
        ])
        .await
        .unwrap();

    let source = Arc::new(FlakySource::new(questions(4)));
    let mut engine = engine_over(source.clone(), &store, 6);

    let err = engine.resume().await.unwrap_err();
    assert!(matches!(err, QuizError::FetchFailed(_)));
    assert!(matches!(engine.state(), QuizState::LoadFailed { .. }));
    assert_eq!(store.len().unwrap(), 3);
    assert_eq!(
        store.get(ProgressKey::QuestionIndex).await.unwrap().as_deref(),
        Some("3")
    );

    source.recover();
    engine.resume().await.unwrap();
    assert!(matches!(engine.state(), QuizState::Presenting { .. }));
    assert_eq!(engine.question_index(), 3);
    assert_eq!(engine.score(), 1);
    assert_eq!(engine.progress().remaining, 2);
}

#[tokio::test]
async fn reset_starts_a_fresh_cycle() {
    let store = InMemoryProgressStore::new();
    let mut engine = engine(questions(2), &store, 11);
    engine.resume().await.unwrap();

    let first = engine.select_answer(correct_key(&engine)).await.unwrap();
    assert!(first.achievement.is_some());
    engine.continue_next().await.unwrap();
    engine.select_answer(correct_key(&engine)).await.unwrap();
    engine.continue_next().await.unwrap();
    assert_eq!(engine.state(), &QuizState::Finished);

    let update = engine.reset().await.unwrap();
    assert!(matches!(update.snapshot.state, QuizState::Presenting { .. }));
    assert_eq!(update.snapshot.progress.question_index, 1);
    assert_eq!(update.snapshot.progress.score, 0);
    assert_eq!(update.snapshot.progress.remaining, 2);

    let again = engine.select_answer(correct_key(&engine)).await.unwrap();
    assert_eq!(
        again.achievement.unwrap().badge_id.as_str(),
        "badge_milk_tooth"
    );
}

#[tokio::test]
async fn finished_survives_a_restart() {
    let store = InMemoryProgressStore::new();
    let mut first = engine(questions(1), &store, 12);
    first.resume().await.unwrap();
    first.select_answer(OptionKey::new("A")).await.unwrap();
    first.continue_next().await.unwrap();
    assert_eq!(first.state(), &QuizState::Finished);

    let mut second = engine(questions(1), &store, 13);
    let update = second.resume().await.unwrap();
    assert_eq!(update.snapshot.state, QuizState::Finished);
    assert_eq!(update.snapshot.progress.score, 1);

    let err = second.continue_next().await.unwrap_err();
    assert!(matches!(err, QuizError::IllegalTransition { state: "finished", .. }));
}
