//! Question sources: where the quiz gets its question set from.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Question, QuestionDraft};
use reqwest::Client;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::SourceError;

/// Asynchronous provider of the full question set.
///
/// Retries, if any, belong to the implementation; the engine calls this once per `resume`.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Fetch every question currently offered.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the questions cannot be retrieved or decoded.
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError>;
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct QuizResponse {
    questions: Vec<QuestionPayload>,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    id: String,
    question: String,
    #[serde(deserialize_with = "ordered_options")]
    options: Vec<(String, String)>,
    correct_option: String,
    #[serde(default)]
    explanation: Option<String>,
}

impl From<QuestionPayload> for QuestionDraft {
    fn from(payload: QuestionPayload) -> Self {
        Self {
            id: payload.id,
            prompt: payload.question,
            options: payload.options,
            correct_option: payload.correct_option,
            explanation: payload.explanation,
        }
    }
}

/// Keeps option entries in document order, duplicates included, so validation sees them.
fn ordered_options<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OptionsVisitor;

    impl<'de> Visitor<'de> for OptionsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of option keys to option text")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(4));
            while let Some(entry) = map.next_entry::<String, String>()? {
                out.push(entry);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(OptionsVisitor)
}

/// Decode a `{"questions": [...]}` payload.
///
/// Questions that fail validation are skipped and logged rather than failing the
/// whole set.
///
/// # Errors
///
/// Returns `SourceError::Decode` if the payload is not the expected JSON shape.
pub fn parse_questions(json: &str) -> Result<Vec<Question>, SourceError> {
    let response: QuizResponse = serde_json::from_str(json)?;
    let total = response.questions.len();
    let questions: Vec<Question> = response
        .questions
        .into_iter()
        .filter_map(|payload| match QuestionDraft::from(payload).validate() {
            Ok(question) => Some(question),
            Err(err) => {
                tracing::warn!(error = %err, "skipping invalid question");
                None
            }
        })
        .collect();
    tracing::debug!(total, valid = questions.len(), "decoded question payload");
    Ok(questions)
}

//
// ─── HTTP ──────────────────────────────────────────────────────────────────────
//

/// Fetches the question document over HTTP(S).
#[derive(Clone)]
pub struct HttpQuizSource {
    client: Client,
    url: Url,
}

impl HttpQuizSource {
    /// # Errors
    ///
    /// Returns `SourceError::Http` if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl QuizSource for HttpQuizSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        tracing::info!(url = %self.url, "fetching questions");
        let response = self.client.get(self.url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus(response.status()));
        }

        // Served as text/plain by some static hosts, so decode the body ourselves.
        let body = response.text().await?;
        parse_questions(&body)
    }
}

//
// ─── LOCAL ─────────────────────────────────────────────────────────────────────
//

/// Reads the question document from a local file on every fetch.
#[derive(Debug, Clone)]
pub struct FileQuizSource {
    path: PathBuf,
}

impl FileQuizSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuizSource for FileQuizSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        tracing::info!(path = %self.path.display(), "reading questions");
        let body = tokio::fs::read_to_string(&self.path).await?;
        parse_questions(&body)
    }
}

/// Serves a fixed question set. Useful offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticQuizSource {
    questions: Vec<Question>,
}

impl StaticQuizSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// # Errors
    ///
    /// Returns `SourceError::Decode` if the payload is not the expected JSON shape.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        Ok(Self::new(parse_questions(json)?))
    }
}

#[async_trait]
impl QuizSource for StaticQuizSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, SourceError> {
        Ok(self.questions.clone())
    }
}
