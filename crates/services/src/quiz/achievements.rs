use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use quiz_core::model::{AchievementEvent, Badge, BadgeCatalog, BadgeId};

use crate::error::ConfigError;

/// How a score change is matched against badge ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AchievementRule {
    /// Fires for every badge whose `min` lies in `(old, new]`; survives multi-point jumps.
    #[default]
    Crossing,
    /// Fires only when `new == min` and `new <= max`; misses badges skipped by a jump.
    ExactMin,
}

impl FromStr for AchievementRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crossing" => Ok(Self::Crossing),
            "exact" | "exact_min" => Ok(Self::ExactMin),
            _ => Err(ConfigError::InvalidAchievementRule { raw: s.to_owned() }),
        }
    }
}

/// Detects newly earned badges, at most once per badge per cycle.
#[derive(Debug, Clone)]
pub struct AchievementTracker {
    catalog: Arc<BadgeCatalog>,
    rule: AchievementRule,
    owned: HashSet<BadgeId>,
}

impl AchievementTracker {
    #[must_use]
    pub fn new(catalog: Arc<BadgeCatalog>, rule: AchievementRule) -> Self {
        Self {
            catalog,
            rule,
            owned: HashSet::new(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<BadgeCatalog> {
        &self.catalog
    }

    #[must_use]
    pub fn rule(&self) -> AchievementRule {
        self.rule
    }

    #[must_use]
    pub fn is_owned(&self, id: &BadgeId) -> bool {
        self.owned.contains(id)
    }

    /// Mark badges already held at `score` as owned without emitting anything.
    pub fn mark_owned_from_score(&mut self, score: u32) {
        for badge in self.catalog.iter().filter(|badge| badge.is_unlocked(score)) {
            self.owned.insert(badge.id.clone());
        }
    }

    pub fn clear(&mut self) {
        self.owned.clear();
    }

    /// Compare a score change against the catalog and return at most one new event.
    pub fn evaluate(&mut self, old_score: u32, new_score: u32) -> Option<AchievementEvent> {
        if new_score <= old_score {
            return None;
        }
        let old = i64::from(old_score);
        let new = i64::from(new_score);

        let fired = match self.rule {
            AchievementRule::ExactMin => self
                .catalog
                .iter()
                .find(|badge| {
                    old < badge.min
                        && new == badge.min
                        && new <= badge.max
                        && !self.owned.contains(&badge.id)
                })
                .cloned(),
            AchievementRule::Crossing => {
                // Every crossed badge becomes owned; the highest one is reported.
                let crossed: Vec<&Badge> = self
                    .catalog
                    .iter()
                    .filter(|badge| {
                        old < badge.min && badge.min <= new && !self.owned.contains(&badge.id)
                    })
                    .collect();
                for badge in &crossed {
                    self.owned.insert(badge.id.clone());
                }
                crossed.last().map(|badge| (*badge).clone())
            }
        };

        let badge = fired?;
        self.owned.insert(badge.id.clone());
        tracing::info!(badge = %badge.id, old_score, new_score, "badge earned");
        Some(AchievementEvent::for_badge(&badge))
    }
}
