use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use quiz_core::model::{Question, QuestionId};

/// The fetched question set plus a random picker over its unanswered remainder.
///
/// The set is an immutable snapshot replaced wholesale by `load`; answered ids are
/// owned by the engine and passed in on every pick.
pub struct QuestionPool {
    questions: Arc<Vec<Question>>,
    rng: StdRng,
}

impl QuestionPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Vec::new()),
            rng: StdRng::from_os_rng(),
        }
    }

    /// A pool whose picks are reproducible for a given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            questions: Arc::new(Vec::new()),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replace the whole question set. Later duplicates of an id are dropped.
    pub fn load(&mut self, questions: Vec<Question>) {
        let mut seen = HashSet::with_capacity(questions.len());
        let mut unique = Vec::with_capacity(questions.len());
        for question in questions {
            if seen.insert(question.id().clone()) {
                unique.push(question);
            } else {
                tracing::warn!(id = %question.id(), "dropping duplicate question id");
            }
        }
        tracing::info!(count = unique.len(), "question pool loaded");
        self.questions = Arc::new(unique);
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Question>> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Number of questions whose id is not in `answered`.
    #[must_use]
    pub fn remaining(&self, answered: &BTreeSet<QuestionId>) -> usize {
        self.questions
            .iter()
            .filter(|question| !answered.contains(question.id()))
            .count()
    }

    /// Pick uniformly at random among questions not in `answered`.
    ///
    /// `None` means the remainder is empty.
    pub fn pick_next(&mut self, answered: &BTreeSet<QuestionId>) -> Option<Question> {
        let unanswered: Vec<&Question> = self
            .questions
            .iter()
            .filter(|question| !answered.contains(question.id()))
            .collect();
        let picked = unanswered.choose(&mut self.rng).map(|question| (*question).clone());
        tracing::debug!(
            remaining = unanswered.len(),
            picked = picked.as_ref().map(|q| q.id().as_str()),
            "picked next question"
        );
        picked
    }
}

impl Default for QuestionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuestionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionPool")
            .field("questions_len", &self.questions.len())
            .finish_non_exhaustive()
    }
}
