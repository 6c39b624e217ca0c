//! Runtime configuration read from `QUIZ_*` environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::quiz::AchievementRule;

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/esmanureral/JSON/main/jsonverisi.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Selects the in-memory progress store instead of `SQLite`.
pub const MEMORY_DB: &str = "memory";

/// Where the question set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionSourceConfig {
    Http(Url),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub db_url: String,
    pub source: QuestionSourceConfig,
    /// Applies to HTTP fetches; kept when the source is switched.
    pub fetch_timeout: Duration,
    pub badges_file: Option<PathBuf>,
    pub achievement_rule: AchievementRule,
}

impl QuizConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let fetch_timeout = match var("QUIZ_FETCH_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_FETCH_TIMEOUT,
        };
        let url = parse_source_url(
            var("QUIZ_SOURCE_URL")
                .as_deref()
                .unwrap_or(DEFAULT_SOURCE_URL),
        )?;
        let source = match var("QUIZ_QUESTIONS_FILE") {
            Some(path) => QuestionSourceConfig::File(PathBuf::from(path)),
            None => QuestionSourceConfig::Http(url),
        };
        let achievement_rule = match var("QUIZ_ACHIEVEMENT_RULE") {
            Some(raw) => raw.parse()?,
            None => AchievementRule::default(),
        };

        let config = Self {
            db_url: String::new(),
            source,
            fetch_timeout,
            badges_file: var("QUIZ_BADGES_FILE").map(PathBuf::from),
            achievement_rule,
        };
        Ok(config.with_db_url(
            var("QUIZ_DB_URL").as_deref().unwrap_or(DEFAULT_DB_URL),
        ))
    }

    #[must_use]
    pub fn with_db_url(mut self, raw: &str) -> Self {
        self.db_url = if raw.trim() == MEMORY_DB {
            MEMORY_DB.to_owned()
        } else {
            normalize_sqlite_url(raw)
        };
        self
    }

    /// Fetch questions over HTTP from `raw`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSourceUrl` unless `raw` is an absolute http(s) URL.
    pub fn with_source_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.source = QuestionSourceConfig::Http(parse_source_url(raw)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_questions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = QuestionSourceConfig::File(path.into());
        self
    }

    #[must_use]
    pub fn with_badges_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.badges_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.db_url == MEMORY_DB
    }
}

fn parse_source_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidSourceUrl {
        raw: raw.to_owned(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            raw: raw.to_owned(),
        }),
    }
}

/// Turn a path or `sqlite:` URL into an absolute `sqlite://` URL that creates the file
/// on first connect.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:") || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_owned();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}?mode=rwc", absolute.display()),
    }
}
