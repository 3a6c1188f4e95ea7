use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{QuizName, ScoreSummary};

use super::progress::QuizStatistics;
use super::session::QuizSession;

const QUESTION_PREVIEW_CHARS: usize = 100;

/// Output formats for a results download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// One question's line in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRow {
    pub question_number: usize,
    pub question: String,
    pub your_answer: Option<usize>,
    pub correct_answer: usize,
    pub is_correct: bool,
    pub time_spent_secs: u64,
    pub flagged: bool,
    pub ruled_out_options: usize,
}

/// Shareable snapshot of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsExport {
    pub quiz_name: QuizName,
    pub score: ScoreSummary,
    pub total_time_secs: u64,
    pub average_time_per_question: u64,
    pub flagged_count: usize,
    pub ruled_out_count: usize,
    pub answers: Vec<AnswerRow>,
    pub exported_at: DateTime<Utc>,
}

impl ResultsExport {
    #[must_use]
    pub(crate) fn build(name: &QuizName, session: &QuizSession, now: DateTime<Utc>) -> Self {
        let stats = QuizStatistics::of(session, now);
        let answers = session
            .questions()
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let submitted = session.is_submitted(i);
                let your_answer = session.answer(i).filter(|_| submitted);
                AnswerRow {
                    question_number: i + 1,
                    question: preview(question.prompt()),
                    your_answer,
                    correct_answer: question.correct_index(),
                    is_correct: your_answer.is_some_and(|a| question.is_correct(a)),
                    time_spent_secs: session.question_time(i),
                    flagged: session.is_flagged(i),
                    ruled_out_options: session.ruled_out(i).len(),
                }
            })
            .collect();

        Self {
            quiz_name: name.clone(),
            score: stats.score,
            total_time_secs: stats.total_time_secs,
            average_time_per_question: stats.average_time_per_question,
            flagged_count: stats.flagged_count,
            ruled_out_count: stats.ruled_out_count,
            answers,
            exported_at: now,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// A summary block followed by one row per question.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let header = ["Question #", "Correct", "Time (s)", "Flagged", "Ruled Out"];
        let score = format!(
            "{}/{} ({}%)",
            self.score.correct, self.score.total, self.score.percentage
        );
        let minutes = (self.total_time_secs + 30) / 60;

        let mut rows: Vec<Vec<String>> = vec![
            header.iter().map(ToString::to_string).collect(),
            summary_row("SUMMARY", ""),
            summary_row("Quiz", self.quiz_name.as_str()),
            summary_row("Score", &score),
            summary_row("Total Time", &format!("{minutes} minutes")),
            summary_row(
                "Average/Question",
                &format!("{}s", self.average_time_per_question),
            ),
            summary_row("", ""),
            header.iter().map(ToString::to_string).collect(),
        ];
        rows.extend(self.answers.iter().map(|row| {
            vec![
                row.question_number.to_string(),
                yes_no(row.is_correct).to_string(),
                row.time_spent_secs.to_string(),
                yes_no(row.flagged).to_string(),
                row.ruled_out_options.to_string(),
            ]
        }));

        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|field| csv_field(field))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `quiz-<name>-<YYYY-MM-DD>.<ext>`, with the name made filesystem-safe.
    #[must_use]
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!(
            "quiz-{}-{}.{}",
            self.quiz_name.sanitized(),
            self.exported_at.format("%Y-%m-%d"),
            format.extension()
        )
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= QUESTION_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(QUESTION_PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

fn summary_row(label: &str, value: &str) -> Vec<String> {
    vec![
        label.to_string(),
        value.to_string(),
        String::new(),
        String::new(),
        String::new(),
    ]
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::Question;
    use quiz_core::time::fixed_now;

    fn export() -> ResultsExport {
        let long_prompt = "x".repeat(150);
        let questions = vec![
            Question::new(long_prompt, vec!["a".into(), "b".into()], 0, None).unwrap(),
            Question::new("Short", vec!["a".into(), "b".into()], 1, None).unwrap(),
        ];
        let mut session = QuizSession::new(questions, fixed_now()).unwrap();
        session.submit(0, fixed_now() + Duration::seconds(40)).unwrap();
        session.move_to(1, fixed_now() + Duration::seconds(40));
        session.toggle_flag();
        session.select(0).unwrap();

        let name = QuizName::new("Acute, Medicine").unwrap();
        ResultsExport::build(&name, &session, fixed_now() + Duration::seconds(150))
    }

    #[test]
    fn rows_reflect_submitted_answers_only() {
        let export = export();

        assert_eq!(export.answers.len(), 2);
        let first = &export.answers[0];
        assert_eq!(first.question.chars().count(), 103);
        assert!(first.question.ends_with("..."));
        assert!(first.is_correct);
        assert_eq!(first.time_spent_secs, 40);

        let second = &export.answers[1];
        assert_eq!(second.question, "Short");
        assert_eq!(second.your_answer, None);
        assert!(!second.is_correct);
        assert!(second.flagged);
    }

    #[test]
    fn csv_has_summary_then_rows_and_quotes_commas() {
        let csv = export().to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Question #,Correct,Time (s),Flagged,Ruled Out");
        assert_eq!(lines[2], "Quiz,\"Acute, Medicine\",,,");
        assert_eq!(lines[3], "Score,1/2 (100%),,,");
        assert_eq!(lines[4], "Total Time,3 minutes,,,");
        assert_eq!(lines[5], "Average/Question,150s,,,");
        assert_eq!(lines[8], "1,Yes,40,No,0");
        assert_eq!(lines[9], "2,No,0,Yes,0");
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = export().to_json().unwrap();
        assert!(json.contains("\"quizName\": \"Acute, Medicine\""));
        assert!(json.contains("\"questionNumber\": 1"));
    }

    #[test]
    fn file_name_is_dated_and_sanitized() {
        let export = export();
        let date = fixed_now().format("%Y-%m-%d");
        assert_eq!(
            export.file_name(ExportFormat::Csv),
            format!("quiz-Acute__Medicine-{date}.csv")
        );
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
    }
}
