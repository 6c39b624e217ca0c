use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::BadgeId;

/// Difficulty tier a badge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl BadgeCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BadgeCategory::Beginner => "beginner",
            BadgeCategory::Intermediate => "intermediate",
            BadgeCategory::Advanced => "advanced",
            BadgeCategory::Expert => "expert",
        }
    }
}

impl fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named achievement tied to an inclusive score range.
///
/// `name` and `icon` are references resolved by the presentation layer
/// (a localisation key and an asset name), never rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    #[serde(rename = "min_value")]
    pub min: i64,
    #[serde(rename = "max_value")]
    pub max: i64,
    pub name: String,
    pub icon: String,
    pub category: BadgeCategory,
}

impl Badge {
    /// True when `score` lies inside `[min, max]`.
    #[must_use]
    pub fn is_unlocked(&self, score: u32) -> bool {
        let score = i64::from(score);
        self.min <= score && score <= self.max
    }
}

/// One-shot signal that a badge has just been earned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementEvent {
    pub badge_id: BadgeId,
    pub badge_name: String,
    pub badge_icon: String,
}

impl AchievementEvent {
    #[must_use]
    pub fn for_badge(badge: &Badge) -> Self {
        Self {
            badge_id: badge.id.clone(),
            badge_name: badge.name.clone(),
            badge_icon: badge.icon.clone(),
        }
    }
}
