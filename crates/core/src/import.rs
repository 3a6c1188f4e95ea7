//! Markdown quiz import.
//!
//! ```text
//! 1. A 64-year-old presents with crushing chest pain.
//! Which investigation comes first?
//! A. ECG
//! B. Chest X-ray
//! C. Troponin
//! Answer: A
//! Explanation: An ECG should be recorded within 10 minutes.
//! ```
//!
//! Options may instead mark the correct choice with a trailing ` *` or by
//! wrapping the text in `**bold**`. Blocks without at least two options or a
//! resolvable answer are skipped.

use crate::model::Question;

/// Output of a markdown parse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuiz {
    pub questions: Vec<Question>,
    /// Numbered blocks that could not be turned into a valid question.
    pub skipped: usize,
}

/// Parses every numbered question block in `content`.
#[must_use]
pub fn parse_markdown_quiz(content: &str) -> ParsedQuiz {
    let mut parsed = ParsedQuiz::default();

    for block in split_blocks(content) {
        match parse_block(&block) {
            Some(question) => parsed.questions.push(question),
            None => parsed.skipped += 1,
        }
    }

    if parsed.skipped > 0 {
        log::debug!(
            "markdown import kept {} question(s), skipped {}",
            parsed.questions.len(),
            parsed.skipped
        );
    }
    parsed
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if numbered_prompt(trimmed).is_some() {
            blocks.push(vec![trimmed]);
        } else if let Some(current) = blocks.last_mut() {
            if !trimmed.is_empty() {
                current.push(trimmed);
            }
        }
    }
    blocks
}

/// `"12. text"` -> `Some("text")`.
fn numbered_prompt(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

/// `"B. text"` -> `Some(('B', "text"))`.
fn option_line(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let letter = chars.next().filter(char::is_ascii_uppercase)?;
    let rest = chars.as_str().strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((letter, rest.trim()))
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| line[prefix.len()..].trim())
}

fn letter_index(letter: char) -> Option<usize> {
    letter
        .is_ascii_uppercase()
        .then(|| usize::from(letter as u8 - b'A'))
}

/// Splits an answer marker off option text.
fn answer_marker(text: &str) -> (&str, bool) {
    if let Some(rest) = text.strip_suffix(" *") {
        return (rest.trim_end(), true);
    }
    match text.strip_prefix("**").and_then(|t| t.strip_suffix("**")) {
        Some(inner) if !inner.trim().is_empty() => (inner.trim(), true),
        _ => (text, false),
    }
}

fn parse_block(lines: &[&str]) -> Option<Question> {
    let (first, rest) = lines.split_first()?;
    let mut prompt = numbered_prompt(first)?.to_string();
    let mut options: Vec<String> = Vec::new();
    let mut correct: Option<usize> = None;
    let mut explanation: Option<String> = None;

    for line in rest {
        if let Some((_, text)) = option_line(line) {
            let (text, marked) = answer_marker(text);
            options.push(text.to_string());
            if marked {
                correct = Some(options.len() - 1);
            }
        } else if let Some(text) = strip_prefix_ignore_case(line, "explanation:") {
            explanation = Some(text.to_string());
        } else if let Some(text) = strip_prefix_ignore_case(line, "answer:") {
            if let Some(index) = text
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .and_then(letter_index)
            {
                correct = Some(index);
            }
        } else if options.is_empty() {
            prompt.push('\n');
            prompt.push_str(line);
        }
    }

    let correct = correct?;
    let explanation = explanation.or_else(|| {
        Some(format!(
            "The correct answer is {}.",
            Question::option_label(correct)
        ))
    });
    Question::new(prompt, options, correct, explanation).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1. A 64-year-old presents with crushing chest pain.
Which investigation comes first?
A. ECG
B. Chest X-ray
C. Troponin
Answer: A
Explanation: Record an ECG within 10 minutes.

2. First-line treatment for anaphylaxis?
A. Chlorphenamine
B. IM adrenaline *
C. Hydrocortisone

3. A block with only one option
A. Lonely

4. No answer given
A. One
B. Two
";

    #[test]
    fn parses_valid_blocks_and_counts_skipped() {
        let parsed = parse_markdown_quiz(SAMPLE);

        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.skipped, 2);

        let first = &parsed.questions[0];
        assert_eq!(
            first.prompt(),
            "A 64-year-old presents with crushing chest pain.\nWhich investigation comes first?"
        );
        assert_eq!(first.options().len(), 3);
        assert_eq!(first.correct_index(), 0);
        assert_eq!(first.explanation(), Some("Record an ECG within 10 minutes."));
    }

    #[test]
    fn star_marks_correct_option_and_default_explanation() {
        let parsed = parse_markdown_quiz(SAMPLE);
        let second = &parsed.questions[1];

        assert_eq!(second.correct_index(), 1);
        assert_eq!(second.options()[1], "IM adrenaline");
        assert_eq!(second.explanation(), Some("The correct answer is B."));
    }

    #[test]
    fn asterisks_inside_option_text_are_not_markers() {
        let parsed = parse_markdown_quiz(
            "1. Dose?\nA. 5 * 3 mg\nB. **15 mg**\nC. 2*2 mg\n\n2. Pick one\nA. x*\nB. y\n",
        );

        assert_eq!(parsed.questions.len(), 1);
        let first = &parsed.questions[0];
        assert_eq!(first.correct_index(), 1);
        assert_eq!(first.options(), ["5 * 3 mg", "15 mg", "2*2 mg"]);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn answer_outside_options_is_skipped() {
        let parsed = parse_markdown_quiz("1. Q\nA. x\nB. y\nanswer: d\n");
        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(parse_markdown_quiz(""), ParsedQuiz::default());
    }
}
