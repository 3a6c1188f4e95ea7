use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use quiz_core::model::Question;

use super::QuestionSource;
use crate::error::SourceError;

/// Question server reachable over HTTP.
///
/// `GET {base}/api/quiz/{name}` returns the questions of one quiz and
/// `GET {base}/api/quizzes` lists what is available.
#[derive(Clone, Debug)]
pub struct HttpQuestionSource {
    client: Client,
    base_url: Url,
}

impl HttpQuestionSource {
    /// # Errors
    ///
    /// Returns `SourceError::Unavailable` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        Self::with_client(Client::new(), base_url)
    }

    /// # Errors
    ///
    /// Returns `SourceError::Unavailable` if `base_url` is not an absolute URL.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, SourceError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| SourceError::Unavailable(format!("invalid base url: {base_url}")))?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::Unavailable(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<T, SourceError> {
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::NotFound(what.to_string())),
            status if !status.is_success() => {
                return Err(SourceError::Network(format!("{what}: HTTP {status}")));
            }
            _ => {}
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch_questions(&self, identifier: &str) -> Result<Vec<Question>, SourceError> {
        let url = self.endpoint(&["api", "quiz", identifier])?;
        let body: QuizResponse = self.get_json(url, identifier).await?;
        body.into_questions(identifier)
    }

    async fn list_quizzes(&self) -> Result<Vec<String>, SourceError> {
        let url = self.endpoint(&["api", "quizzes"])?;
        let body: QuizListResponse = self.get_json(url, "quiz list").await?;
        if !body.success {
            return Err(SourceError::Unavailable(
                body.error.unwrap_or_else(|| "quiz list unavailable".into()),
            ));
        }
        let mut names: Vec<String> = body.quizzes.into_iter().map(|q| q.name).collect();
        names.sort();
        Ok(names)
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct QuizResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    questions: Option<Vec<WireQuestion>>,
    #[serde(default)]
    quiz: Option<WireQuiz>,
}

#[derive(Debug, Deserialize)]
struct WireQuiz {
    #[serde(default)]
    questions: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    #[serde(default)]
    scenario: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: Option<usize>,
    /// A single string or a list of paragraphs.
    #[serde(default)]
    explanations: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QuizListResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    quizzes: Vec<QuizListing>,
}

#[derive(Debug, Deserialize)]
struct QuizListing {
    name: String,
}

fn default_success() -> bool {
    true
}

impl QuizResponse {
    fn into_questions(self, identifier: &str) -> Result<Vec<Question>, SourceError> {
        if !self.success {
            return Err(SourceError::NotFound(
                self.error.unwrap_or_else(|| identifier.to_string()),
            ));
        }
        let wire = self
            .questions
            .or(self.quiz.map(|quiz| quiz.questions))
            .ok_or_else(|| SourceError::Parse(format!("{identifier}: no questions field")))?;

        wire.into_iter()
            .enumerate()
            .map(|(i, q)| {
                q.into_question()
                    .map_err(|e| SourceError::Parse(format!("{identifier} #{}: {e}", i + 1)))
            })
            .collect()
    }
}

impl WireQuestion {
    fn into_question(self) -> Result<Question, String> {
        let prompt = match (self.scenario, self.prompt) {
            (Some(scenario), Some(prompt)) if !scenario.trim().is_empty() => {
                format!("{}\n\n{}", scenario.trim(), prompt.trim())
            }
            (Some(scenario), None) => scenario,
            (_, Some(prompt)) => prompt,
            (None, None) => String::new(),
        };
        let correct = self
            .correct_answer
            .ok_or_else(|| "missing correct_answer".to_string())?;
        let explanation = self.explanations.and_then(|value| explanation_text(&value));
        Question::new(prompt, self.options, correct, explanation).map_err(|e| e.to_string())
    }
}

fn explanation_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        _ => None,
    }
}
