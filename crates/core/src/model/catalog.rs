use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::model::badge::Badge;
use crate::model::ids::BadgeId;

const DEFAULT_CATALOG_JSON: &str = include_str!("../../data/default_badges.json");

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Configuration errors found while loading a badge catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("badge {id} has min {min} greater than max {max}")]
    InvalidRange { id: BadgeId, min: i64, max: i64 },

    #[error("badge id {0} appears more than once")]
    DuplicateId(BadgeId),

    #[error("badge {first} overlaps badge {second}")]
    Overlap { first: BadgeId, second: BadgeId },

    #[error("badge catalog is not valid JSON: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: u32,
    badges: Vec<Badge>,
}

/// Status of one badge for a badge-listing display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeStatus {
    pub badge: Badge,
    pub unlocked: bool,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only, validated set of score-range badges in ascending `min` order.
///
/// Ranges never overlap; gaps are allowed and mean no badge applies there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeCatalog {
    version: u32,
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    /// Validate and order a list of badges.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a range is inverted, an id repeats, or two ranges overlap.
    pub fn new(version: u32, mut badges: Vec<Badge>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::with_capacity(badges.len());
        for badge in &badges {
            if badge.min > badge.max {
                return Err(CatalogError::InvalidRange {
                    id: badge.id.clone(),
                    min: badge.min,
                    max: badge.max,
                });
            }
            if !ids.insert(badge.id.clone()) {
                return Err(CatalogError::DuplicateId(badge.id.clone()));
            }
        }

        badges.sort_by_key(|badge| (badge.min, badge.max));

        // Sorted by min with no overlap so far means maxes are increasing too,
        // so comparing neighbours is enough.
        for pair in badges.windows(2) {
            if pair[0].max >= pair[1].min {
                return Err(CatalogError::Overlap {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        Ok(Self { version, badges })
    }

    /// Parse a `{ "version": n, "badges": [...] }` document and validate it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON, or any validation error from `new`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::new(file.version, file.badges)
    }

    /// The catalog shipped with the app.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded document is invalid.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG_JSON)
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Badges in ascending `min` order.
    pub fn iter(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.badges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|badge| &badge.id == id)
    }

    #[must_use]
    pub fn is_unlocked(badge: &Badge, score: u32) -> bool {
        badge.is_unlocked(score)
    }

    /// The badge whose range holds `score`, if any. At most one exists.
    #[must_use]
    pub fn badge_for(&self, score: u32) -> Option<&Badge> {
        self.badges.iter().find(|badge| badge.is_unlocked(score))
    }

    /// Every badge with its unlocked flag for `score`, in catalog order.
    #[must_use]
    pub fn statuses(&self, score: u32) -> Vec<BadgeStatus> {
        self.badges
            .iter()
            .map(|badge| BadgeStatus {
                badge: badge.clone(),
                unlocked: badge.is_unlocked(score),
            })
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
