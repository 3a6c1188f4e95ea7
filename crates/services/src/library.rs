//! Quizzes imported from user files, kept in the key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use quiz_core::Clock;
use quiz_core::import::parse_markdown_quiz;
use quiz_core::model::{Question, QuizName};
use storage::keys::UPLOADED_QUIZZES;
use storage::repository::{load_json, save_json};
use storage::{KeyValueStore, StorageError};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::{LibraryError, SourceError};
use crate::sources::QuestionSource;

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedQuiz {
    pub name: QuizName,
    pub questions: Vec<Question>,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing entry without the question bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedQuizSummary {
    pub name: QuizName,
    pub question_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Result of a markdown import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub quiz: UploadedQuiz,
    pub skipped: usize,
    /// `true` if an upload with the same name was overwritten.
    pub replaced: bool,
}

/// Decoded uploads plus any stored entries that no longer decode.
///
/// Undecodable entries are written back untouched so a save never drops them.
#[derive(Debug, Default)]
struct StoredUploads {
    quizzes: Vec<UploadedQuiz>,
    unreadable: Vec<Value>,
}

#[derive(Clone)]
pub struct QuizLibrary {
    store: Arc<dyn KeyValueStore>,
    clock: Clock,
    max_bytes: u64,
}

impl QuizLibrary {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        Self {
            store,
            clock,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn load_stored(&self) -> Result<StoredUploads, LibraryError> {
        let entries: Option<Vec<Value>> = load_json(self.store.as_ref(), UPLOADED_QUIZZES).await?;
        let mut stored = StoredUploads::default();
        for entry in entries.unwrap_or_default() {
            match serde_json::from_value::<UploadedQuiz>(entry.clone()) {
                Ok(quiz) => stored.quizzes.push(quiz),
                Err(err) => {
                    log::warn!("skipping unreadable uploaded quiz: {err}");
                    stored.unreadable.push(entry);
                }
            }
        }
        Ok(stored)
    }

    async fn load_all(&self) -> Result<Vec<UploadedQuiz>, LibraryError> {
        Ok(self.load_stored().await?.quizzes)
    }

    async fn save_stored(&self, stored: &StoredUploads) -> Result<(), LibraryError> {
        let mut entries = stored
            .quizzes
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        entries.extend(stored.unreadable.iter().cloned());
        save_json(self.store.as_ref(), UPLOADED_QUIZZES, &entries).await?;
        Ok(())
    }

    /// Parse a markdown quiz file and store it under `name`.
    ///
    /// # Errors
    ///
    /// - `LibraryError::TooLarge` if `content` exceeds the upload limit.
    /// - `LibraryError::NoQuestions` if no block parsed into a valid question.
    /// - `LibraryError::Name` for a blank name, `LibraryError::Storage` on I/O failure.
    pub async fn import_markdown(
        &self,
        name: &str,
        content: &str,
    ) -> Result<ImportReport, LibraryError> {
        let bytes = content.len() as u64;
        if bytes > self.max_bytes {
            return Err(LibraryError::TooLarge {
                bytes,
                limit: self.max_bytes,
            });
        }
        let name = QuizName::new(name)?;
        let parsed = parse_markdown_quiz(content);
        if parsed.questions.is_empty() {
            return Err(LibraryError::NoQuestions(name.to_string()));
        }

        let (quiz, replaced) = self.save(name, parsed.questions).await?;
        log::info!(
            "imported quiz {} ({} questions, {} skipped)",
            quiz.name,
            quiz.questions.len(),
            parsed.skipped
        );
        Ok(ImportReport {
            quiz,
            skipped: parsed.skipped,
            replaced,
        })
    }

    /// Store `questions` under `name`, replacing any upload with that name.
    ///
    /// Returns the stored record and whether it replaced an existing one.
    ///
    /// # Errors
    ///
    /// `LibraryError::NoQuestions` for an empty list, `LibraryError::Storage`
    /// on I/O failure.
    pub async fn save(
        &self,
        name: QuizName,
        questions: Vec<Question>,
    ) -> Result<(UploadedQuiz, bool), LibraryError> {
        if questions.is_empty() {
            return Err(LibraryError::NoQuestions(name.to_string()));
        }
        let quiz = UploadedQuiz {
            name,
            questions,
            uploaded_at: self.clock.now(),
        };

        let mut stored = self.load_stored().await?;
        let before = stored.quizzes.len();
        stored.quizzes.retain(|existing| existing.name != quiz.name);
        let replaced = stored.quizzes.len() != before;
        stored.quizzes.push(quiz.clone());
        stored.quizzes.sort_by(|a, b| a.name.cmp(&b.name));
        self.save_stored(&stored).await?;

        Ok((quiz, replaced))
    }

    /// # Errors
    ///
    /// Returns `LibraryError::Storage` on I/O failure.
    pub async fn get(&self, name: &QuizName) -> Result<Option<UploadedQuiz>, LibraryError> {
        let all = self.load_all().await?;
        Ok(all.into_iter().find(|quiz| &quiz.name == name))
    }

    /// # Errors
    ///
    /// Returns `LibraryError::Storage` on I/O failure.
    pub async fn list(&self) -> Result<Vec<UploadedQuizSummary>, LibraryError> {
        let all = self.load_all().await?;
        Ok(all
            .into_iter()
            .map(|quiz| UploadedQuizSummary {
                question_count: quiz.questions.len(),
                name: quiz.name,
                uploaded_at: quiz.uploaded_at,
            })
            .collect())
    }

    /// Returns `true` if an upload was deleted.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` on I/O failure.
    pub async fn remove(&self, name: &QuizName) -> Result<bool, LibraryError> {
        let mut stored = self.load_stored().await?;
        let before = stored.quizzes.len();
        stored.quizzes.retain(|quiz| &quiz.name != name);
        if stored.quizzes.len() == before {
            return Ok(false);
        }
        self.save_stored(&stored).await?;
        Ok(true)
    }

    /// Drops every upload.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` on I/O failure.
    pub async fn clear_all(&self) -> Result<(), LibraryError> {
        self.store.remove(UPLOADED_QUIZZES).await?;
        log::info!("cleared uploaded quizzes");
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for QuizLibrary {
    async fn fetch_questions(&self, identifier: &str) -> Result<Vec<Question>, SourceError> {
        let name =
            QuizName::new(identifier).map_err(|_| SourceError::NotFound(identifier.to_string()))?;
        match self.get(&name).await {
            Ok(Some(quiz)) => Ok(quiz.questions),
            Ok(None) => Err(SourceError::NotFound(identifier.to_string())),
            Err(err) => Err(SourceError::Unavailable(err.to_string())),
        }
    }

    async fn list_quizzes(&self) -> Result<Vec<String>, SourceError> {
        let all = self
            .list()
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;
        Ok(all.into_iter().map(|quiz| quiz.name.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;
    use storage::InMemoryStore;

    const MARKDOWN: &str = "\
1. Most common cause of community-acquired pneumonia?
A. Streptococcus pneumoniae
B. Haemophilus influenzae
Answer: A

2. Broken block
A. only one option
";

    fn library() -> QuizLibrary {
        QuizLibrary::new(Arc::new(InMemoryStore::new()), Clock::fixed(fixed_now()))
    }

    fn quiz_names(summaries: &[UploadedQuizSummary]) -> Vec<String> {
        summaries.iter().map(|quiz| quiz.name.to_string()).collect()
    }

    #[tokio::test]
    async fn import_stores_parsed_questions() {
        let library = library();

        let report = library.import_markdown("Respiratory", MARKDOWN).await.unwrap();
        assert_eq!(report.quiz.questions.len(), 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.replaced);

        let again = library.import_markdown("Respiratory", MARKDOWN).await.unwrap();
        assert!(again.replaced);

        let listed = library.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].question_count, 1);
        assert_eq!(listed[0].uploaded_at, fixed_now());
    }

    #[tokio::test]
    async fn import_rejects_empty_and_oversized_files() {
        let library = library().with_max_bytes(64);

        assert!(matches!(
            library.import_markdown("Empty", "no questions here").await,
            Err(LibraryError::NoQuestions(_))
        ));
        assert!(matches!(
            library.import_markdown("Big", MARKDOWN).await,
            Err(LibraryError::TooLarge { limit: 64, .. })
        ));
        assert!(matches!(
            library.import_markdown("  ", "1. Q\nA. a *\nB. b\n").await,
            Err(LibraryError::Name(_))
        ));
    }

    #[tokio::test]
    async fn serves_as_question_source() {
        let library = library();
        library.import_markdown("Respiratory", MARKDOWN).await.unwrap();

        let questions = library.fetch_questions("Respiratory").await.unwrap();
        assert_eq!(questions[0].correct_index(), 0);
        assert!(matches!(
            library.fetch_questions("Missing").await,
            Err(SourceError::NotFound(_))
        ));
        assert_eq!(library.list_quizzes().await.unwrap(), vec!["Respiratory"]);
    }

    #[tokio::test]
    async fn remove_and_clear_all() {
        let library = library();
        library.import_markdown("A", MARKDOWN).await.unwrap();
        library.import_markdown("B", MARKDOWN).await.unwrap();

        assert!(library.remove(&QuizName::new("A").unwrap()).await.unwrap());
        assert!(!library.remove(&QuizName::new("A").unwrap()).await.unwrap());
        assert_eq!(library.list().await.unwrap().len(), 1);

        library.clear_all().await.unwrap();
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_upload_survives_later_saves() {
        let store = Arc::new(InMemoryStore::new());
        let library = QuizLibrary::new(store.clone(), Clock::fixed(fixed_now()));
        library.import_markdown("A", MARKDOWN).await.unwrap();
        library.import_markdown("B", MARKDOWN).await.unwrap();

        let mut stored = store.get(UPLOADED_QUIZZES).await.unwrap().unwrap();
        stored[1]["questions"][0]["correctIndex"] = serde_json::json!(9);
        store.set(UPLOADED_QUIZZES, stored).await.unwrap();

        assert_eq!(quiz_names(&library.list().await.unwrap()), vec!["A"]);

        library.import_markdown("C", MARKDOWN).await.unwrap();
        assert!(library.remove(&QuizName::new("A").unwrap()).await.unwrap());
        assert_eq!(quiz_names(&library.list().await.unwrap()), vec!["C"]);

        let raw = store.get(UPLOADED_QUIZZES).await.unwrap().unwrap();
        let names: Vec<&str> = raw
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|entry| entry["name"].as_str())
            .collect();
        assert_eq!(names, vec!["C", "B"]);
    }
}
