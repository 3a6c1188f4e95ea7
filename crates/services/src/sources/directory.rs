use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use quiz_core::import::parse_markdown_quiz;
use quiz_core::model::Question;

use super::QuestionSource;
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::SourceError;

const EXTENSIONS: [&str; 2] = ["md", "json"];

/// Quiz files on local disk: `<dir>/<name>.md` in the markdown quiz format, or
/// `<dir>/<name>.json` holding an array of questions.
#[derive(Clone, Debug)]
pub struct DirectoryQuestionSource {
    root: PathBuf,
    max_bytes: u64,
}

impl DirectoryQuestionSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn locate(&self, identifier: &str) -> Result<(PathBuf, &'static str), SourceError> {
        let plain = !identifier.is_empty()
            && !identifier.starts_with('.')
            && !identifier.contains(['/', '\\'])
            && !identifier.contains("..");
        if !plain {
            return Err(SourceError::NotFound(identifier.to_string()));
        }

        for ext in EXTENSIONS {
            let path = self.root.join(format!("{identifier}.{ext}"));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok((path, ext));
            }
        }
        Err(SourceError::NotFound(identifier.to_string()))
    }

    async fn read_limited(&self, path: &Path) -> Result<String, SourceError> {
        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        if metadata.len() > self.max_bytes {
            return Err(SourceError::TooLarge {
                bytes: metadata.len(),
                limit: self.max_bytes,
            });
        }
        tokio::fs::read_to_string(path).await.map_err(io_error)
    }
}

fn io_error(err: std::io::Error) -> SourceError {
    match err.kind() {
        ErrorKind::NotFound => SourceError::NotFound(err.to_string()),
        ErrorKind::InvalidData => SourceError::Parse(err.to_string()),
        _ => SourceError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl QuestionSource for DirectoryQuestionSource {
    async fn fetch_questions(&self, identifier: &str) -> Result<Vec<Question>, SourceError> {
        let (path, ext) = self.locate(identifier).await?;
        let content = self.read_limited(&path).await?;
        log::debug!("loading quiz {identifier:?} from {}", path.display());

        if ext == "json" {
            return serde_json::from_str(&content)
                .map_err(|e| SourceError::Parse(format!("{}: {e}", path.display())));
        }

        let parsed = parse_markdown_quiz(&content);
        if parsed.skipped > 0 {
            log::warn!(
                "{}: skipped {} malformed question block(s)",
                path.display(),
                parsed.skipped
            );
        }
        Ok(parsed.questions)
    }

    async fn list_quizzes(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_error)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !known {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_markdown_and_json_quizzes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(
            dir.join("cardio.md"),
            "1. First-line for AF rate control?\nA. Bisoprolol *\nB. Amiodarone\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("renal.json"),
            r#"[{"prompt":"K+ 7.1, first step?","options":["Calcium gluconate","Insulin"],"correctIndex":0}]"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let source = DirectoryQuestionSource::new(dir);
        assert_eq!(
            source.list_quizzes().await.unwrap(),
            vec!["cardio".to_string(), "renal".to_string()]
        );
        assert_eq!(source.fetch_questions("cardio").await.unwrap()[0].correct_index(), 0);
        assert_eq!(source.fetch_questions("renal").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_traversal_missing_and_oversized() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("big.md"), "1. Q\nA. a *\nB. b\n").unwrap();
        let source = DirectoryQuestionSource::new(dir).with_max_bytes(4);

        assert!(matches!(
            source.fetch_questions("../etc/passwd").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.fetch_questions("absent").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.fetch_questions("big").await,
            Err(SourceError::TooLarge { limit: 4, .. })
        ));
    }
}
