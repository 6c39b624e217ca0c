use std::sync::Arc;

use quiz_core::model::BadgeCatalog;
use storage::repository::Storage;

use crate::config::{QuestionSourceConfig, QuizConfig};
use crate::error::AppServicesError;
use crate::quiz::QuizEngine;
use crate::source::{FileQuizSource, HttpQuizSource, QuizSource};

/// Assembles the quiz engine and its collaborators from a `QuizConfig`.
pub struct AppServices {
    catalog: Arc<BadgeCatalog>,
    storage: Storage,
    engine: QuizEngine,
}

impl AppServices {
    /// Build services for `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the badge catalog is unreadable or invalid, the HTTP
    /// client cannot be built, or storage initialization fails.
    pub async fn from_config(config: &QuizConfig) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(load_catalog(config)?);

        let storage = if config.uses_memory_store() {
            Storage::in_memory()
        } else {
            Storage::sqlite(&config.db_url).await?
        };

        let source: Arc<dyn QuizSource> = match &config.source {
            QuestionSourceConfig::Http(url) => {
                Arc::new(HttpQuizSource::new(url.clone(), config.fetch_timeout)?)
            }
            QuestionSourceConfig::File(path) => Arc::new(FileQuizSource::new(path.clone())),
        };

        Ok(Self::new(catalog, storage, source, config))
    }

    /// Build services over already-constructed parts.
    #[must_use]
    pub fn new(
        catalog: Arc<BadgeCatalog>,
        storage: Storage,
        source: Arc<dyn QuizSource>,
        config: &QuizConfig,
    ) -> Self {
        let engine = QuizEngine::new(
            source,
            Arc::clone(&storage.progress),
            Arc::clone(&catalog),
        )
        .with_rule(config.achievement_rule);
        tracing::debug!(
            badges = catalog.len(),
            catalog_version = catalog.version(),
            rule = ?config.achievement_rule,
            "quiz services ready"
        );
        Self {
            catalog,
            storage,
            engine,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<BadgeCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn engine(&self) -> &QuizEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut QuizEngine {
        &mut self.engine
    }

    #[must_use]
    pub fn into_engine(self) -> QuizEngine {
        self.engine
    }
}

fn load_catalog(config: &QuizConfig) -> Result<BadgeCatalog, AppServicesError> {
    match &config.badges_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading badge catalog");
            let json = std::fs::read_to_string(path)?;
            Ok(BadgeCatalog::from_json(&json)?)
        }
        None => Ok(BadgeCatalog::embedded()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::QuizState;
    use crate::source::StaticQuizSource;

    #[tokio::test]
    async fn memory_config_builds_a_loading_engine() {
        let config = QuizConfig::from_lookup(|key| match key {
            "QUIZ_DB_URL" => Some("memory".into()),
            _ => None,
        })
        .unwrap();
        let services = AppServices::from_config(&config).await.unwrap();
        assert_eq!(services.engine().state(), &QuizState::Loading);
        assert_eq!(services.catalog().len(), 6);
    }

    #[tokio::test]
    async fn missing_badge_file_is_an_io_error() {
        let config = QuizConfig::from_lookup(|key| match key {
            "QUIZ_DB_URL" => Some("memory".into()),
            "QUIZ_BADGES_FILE" => Some("/definitely/not/here/badges.json".into()),
            _ => None,
        })
        .unwrap();
        let err = AppServices::from_config(&config).await.err().unwrap();
        assert!(matches!(err, AppServicesError::CatalogIo(_)));
    }

    #[tokio::test]
    async fn parts_are_shared_with_the_engine() {
        let config = QuizConfig::from_lookup(|_| None).unwrap();
        let mut services = AppServices::new(
            Arc::new(BadgeCatalog::embedded().unwrap()),
            Storage::in_memory(),
            Arc::new(StaticQuizSource::default()),
            &config,
        );
        let update = services.engine_mut().resume().await.unwrap();
        assert_eq!(update.snapshot.state, QuizState::Finished);
        assert_eq!(services.engine().catalog().len(), 6);
    }
}
