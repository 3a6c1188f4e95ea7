//! Line-based quiz driver for the terminal.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use quiz_core::events::QuizEvent;
use quiz_core::model::{Question, QuizLength, QuizResult};
use services::{ExportFormat, QuizEngine, QuizError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Select(usize),
    Submit(Option<usize>),
    Next,
    Previous,
    GoTo(usize),
    Flag,
    RuleOut(usize),
    Save,
    Finish,
    Export(ExportFormat),
    Help,
    Quit,
}

fn option_index(raw: &str) -> Option<usize> {
    let mut chars = raw.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !letter.is_ascii_uppercase() {
        return None;
    }
    Some(usize::from(letter as u8 - b'A'))
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    // A lone capital letter picks an option; lowercase words are commands.
    if rest.is_empty() && head.len() == 1 && head.chars().all(|c| c.is_ascii_uppercase()) {
        return option_index(head)
            .map(Input::Select)
            .ok_or_else(|| format!("not an option letter: {head}"));
    }

    match (head, rest) {
        ("s", "") => Ok(Input::Submit(None)),
        ("s", letter) => option_index(letter)
            .map(|i| Input::Submit(Some(i)))
            .ok_or_else(|| format!("not an option letter: {letter}")),
        ("n", "") => Ok(Input::Next),
        ("p", "") => Ok(Input::Previous),
        ("g", number) => match number.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Input::GoTo(n - 1)),
            _ => Err(format!("not a question number: {number:?}")),
        },
        ("f", "") => Ok(Input::Flag),
        ("x", letter) => option_index(letter)
            .map(Input::RuleOut)
            .ok_or_else(|| format!("not an option letter: {letter:?}")),
        ("save", "") => Ok(Input::Save),
        ("finish", "") => Ok(Input::Finish),
        ("export", format) => format.parse().map(Input::Export),
        ("h" | "help" | "?", "") => Ok(Input::Help),
        ("q" | "quit", "") => Ok(Input::Quit),
        _ => Err(format!("unknown command: {line:?} (type h for help)")),
    }
}

fn print_help() {
    println!("  A..Z        select an option");
    println!("  s [X]       submit the selection (or option X)");
    println!("  n / p       next / previous question");
    println!("  g N         go to question N");
    println!("  f           flag or unflag this question");
    println!("  x X         rule option X out (again to restore)");
    println!("  save        save progress");
    println!("  finish      finish and record the result");
    println!("  export json|csv");
    println!("  q           save and quit");
}

fn render(engine: &QuizEngine) {
    let (Some(question), Some(session)) = (engine.current_question(), engine.session()) else {
        return;
    };
    let view = session.view();

    println!();
    println!(
        "Question {}/{}{}",
        view.index + 1,
        view.total,
        if view.flagged { "  [flagged]" } else { "" }
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        let marker = match (view.selected == Some(i), view.ruled_out.contains(&i)) {
            (true, _) => ">",
            (false, true) => "~",
            (false, false) => " ",
        };
        println!(" {marker} {}. {option}", Question::option_label(i));
    }
    if view.submitted {
        print_feedback(question, view.selected);
    }
}

fn print_feedback(question: &Question, selected: Option<usize>) {
    let correct = question.correct_index();
    if selected != Some(correct) {
        println!(
            "Answer: {}. {}",
            Question::option_label(correct),
            question.options()[correct]
        );
    }
    if let Some(explanation) = question.explanation() {
        println!("{explanation}");
    }
}

fn print_result(result: &QuizResult) {
    println!();
    println!(
        "{}: {}/{} correct ({}%), {} unanswered, {}m {}s",
        result.name,
        result.score.correct,
        result.score.answered,
        result.score.percentage,
        result.score.unanswered,
        result.total_time_secs / 60,
        result.total_time_secs % 60
    );
    if !result.flagged.is_empty() {
        let flagged: Vec<String> = result.flagged.iter().map(|i| (i + 1).to_string()).collect();
        println!("Flagged: {}", flagged.join(", "));
    }
}

/// Prints one line of feedback per notification.
pub fn print_event(event: &QuizEvent) {
    match event {
        QuizEvent::QuizStarted {
            name,
            question_count,
            pool_size,
        } => println!("Starting {name}: {question_count} of {pool_size} questions"),
        QuizEvent::AnswerSubmitted {
            is_correct,
            answered,
            total,
            time_spent_secs,
            ..
        } => println!(
            "{} ({answered}/{total} answered, {time_spent_secs}s)",
            if *is_correct { "Correct!" } else { "Incorrect." }
        ),
        QuizEvent::FlagToggled { index, flagged } => println!(
            "Question {} {}",
            index + 1,
            if *flagged { "flagged" } else { "unflagged" }
        ),
        QuizEvent::RuleOutToggled {
            option, ruled_out, ..
        } => println!(
            "Option {} {}",
            Question::option_label(*option),
            if *ruled_out { "ruled out" } else { "restored" }
        ),
        QuizEvent::ProgressSaved { .. } => println!("Progress saved."),
        QuizEvent::QuizFinished(result) => print_result(result),
        _ => {}
    }
}

async fn finish(engine: &QuizEngine) {
    match engine.finish_quiz().await {
        Ok(_) => {}
        Err(err) => {
            eprintln!("warning: result could not be saved ({err})");
            if let Ok(result) = engine.build_result() {
                print_result(&result);
            }
        }
    }
    if let Some(name) = engine.quiz_name() {
        if let Err(err) = engine.clear_progress(name).await {
            log::warn!("could not clear saved progress: {err}");
        }
    }
}

fn export(engine: &QuizEngine, format: ExportFormat) -> Result<(), Box<dyn std::error::Error>> {
    let export = engine.export_results()?;
    let content = match format {
        ExportFormat::Json => export.to_json()?,
        ExportFormat::Csv => export.to_csv(),
    };
    let file_name = export.file_name(format);
    std::fs::write(&file_name, content)?;
    println!("Wrote {file_name}");
    Ok(())
}

/// Resume saved progress or start a fresh attempt, then read commands until
/// the quiz is finished or the user quits.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or no quiz is loaded.
pub async fn run_quiz(
    engine: &mut QuizEngine,
    length: QuizLength,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = engine.quiz_name().cloned().ok_or(QuizError::NoActiveQuiz)?;
    match engine.load_progress(&name).await {
        Ok(true) => println!("Resuming saved progress for {name}."),
        Ok(false) => engine.start_quiz_with(length)?,
        Err(err) => {
            eprintln!("warning: progress may not be saved ({err})");
            engine.start_quiz_with(length)?;
        }
    }
    render(engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            save_quietly(engine).await;
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        let outcome: Result<(), QuizError> = match input {
            Input::Select(option) => engine.select_answer(option),
            Input::Submit(option) => {
                let selected = engine.current_index().and_then(|i| engine.answer(i));
                match option.or(selected) {
                    Some(option) => engine.submit_answer(option).map(|_| ()),
                    None => {
                        println!("Pick an option first.");
                        continue;
                    }
                }
            }
            Input::Next => {
                if !engine.next_question() {
                    if engine.progress().is_some_and(|p| p.is_complete()) {
                        finish(engine).await;
                        return Ok(());
                    }
                    println!("That was the last question. Type `finish` to end the quiz.");
                    continue;
                }
                Ok(())
            }
            Input::Previous => {
                if !engine.previous_question() {
                    println!("Already at the first question.");
                    continue;
                }
                Ok(())
            }
            Input::GoTo(index) => {
                if !engine.go_to_question(index) {
                    println!("No question {}.", index + 1);
                    continue;
                }
                Ok(())
            }
            Input::Flag => engine.toggle_flag().map(|_| ()),
            Input::RuleOut(option) => engine.toggle_rule_out(option).map(|_| ()),
            Input::Save => engine.save_progress().await,
            Input::Finish => {
                finish(engine).await;
                return Ok(());
            }
            Input::Export(format) => {
                if let Err(err) = export(engine, format) {
                    println!("export failed: {err}");
                }
                continue;
            }
            Input::Help => {
                print_help();
                continue;
            }
            Input::Quit => {
                save_quietly(engine).await;
                return Ok(());
            }
        };

        match outcome {
            Ok(()) => render(engine),
            Err(QuizError::AlreadySubmitted { .. }) => println!("Already submitted."),
            Err(err) => println!("{err}"),
        }
    }
}

async fn save_quietly(engine: &QuizEngine) {
    if !engine.is_active() {
        return;
    }
    if let Err(err) = engine.save_progress().await {
        eprintln!("warning: progress may not be saved ({err})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capital_letters_select_options() {
        assert_eq!(parse_input("B"), Ok(Input::Select(1)));
        assert_eq!(parse_input(" E "), Ok(Input::Select(4)));
    }

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(parse_input("s"), Ok(Input::Submit(None)));
        assert_eq!(parse_input("s c"), Ok(Input::Submit(Some(2))));
        assert_eq!(parse_input("g 3"), Ok(Input::GoTo(2)));
        assert_eq!(parse_input("x a"), Ok(Input::RuleOut(0)));
        assert_eq!(parse_input("export csv"), Ok(Input::Export(ExportFormat::Csv)));
        assert_eq!(parse_input("f"), Ok(Input::Flag));
        assert_eq!(parse_input("q"), Ok(Input::Quit));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(parse_input("g 0").is_err());
        assert!(parse_input("x 12").is_err());
        assert!(parse_input("export pdf").is_err());
        assert!(parse_input("jump").is_err());
    }
}
