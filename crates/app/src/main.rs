use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::calculators::{CalculatorInputs, CalculatorRegistry};
use quiz_core::model::QuizLength;
use services::{
    Clock, DirectoryQuestionSource, HttpQuestionSource, QuestionSource, QuizConfig, QuizEngine,
    QuizError, QuizLibrary, QuizPreferencesService, SourceError,
};
use storage::repository::Storage;

mod interactive;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    InvalidLength { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLength { raw } => write!(f, "invalid --length value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz run <quiz>       [--db <sqlite_url>] [--dir <path>] [--api <url>] [--length <n|all>]");
    eprintln!("  quiz import <file.md> [--db <sqlite_url>] [--name <quiz name>]");
    eprintln!("  quiz list             [--db <sqlite_url>] [--dir <path>] [--api <url>]");
    eprintln!("  quiz stats            [--db <sqlite_url>]");
    eprintln!("  quiz calc [<id> key=value ...]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --length stored preference, else 20");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_DIR, QUIZ_API_URL, QUIZ_LENGTH, QUIZ_PROGRESS_MAX_AGE_DAYS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Import,
    List,
    Stats,
    Calc,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "import" => Some(Self::Import),
            "list" => Some(Self::List),
            "stats" => Some(Self::Stats),
            "calc" => Some(Self::Calc),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    quiz_dir: Option<PathBuf>,
    api_url: Option<String>,
    length: Option<QuizLength>,
    name: Option<String>,
    positional: Vec<String>,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url),
            quiz_dir: std::env::var("QUIZ_DIR").ok().map(PathBuf::from),
            api_url: std::env::var("QUIZ_API_URL").ok(),
            length: None,
            name: None,
            positional: Vec::new(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--dir" => parsed.quiz_dir = Some(require_value(args, "--dir")?.into()),
                "--api" => parsed.api_url = Some(require_value(args, "--api")?),
                "--length" => {
                    let value = require_value(args, "--length")?;
                    let length = value
                        .parse::<QuizLength>()
                        .map_err(|_| ArgsError::InvalidLength { raw: value.clone() })?;
                    parsed.length = Some(length);
                }
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => parsed.positional.push(arg),
            }
        }

        match cmd {
            Command::Run if parsed.positional.len() != 1 => {
                Err(ArgsError::MissingArgument { what: "quiz name" })
            }
            Command::Import if parsed.positional.len() != 1 => {
                Err(ArgsError::MissingArgument { what: "markdown file" })
            }
            Command::List | Command::Stats if !parsed.positional.is_empty() => {
                Err(ArgsError::UnknownArg(parsed.positional.remove(0)))
            }
            _ => Ok(parsed),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Uploaded quizzes first, then the quiz directory, then the remote server.
fn question_sources(
    library: &QuizLibrary,
    args: &Args,
) -> Result<Vec<(&'static str, Box<dyn QuestionSource>)>, SourceError> {
    let mut sources: Vec<(&'static str, Box<dyn QuestionSource>)> = Vec::new();
    sources.push(("uploaded", Box::new(library.clone())));
    if let Some(dir) = &args.quiz_dir {
        sources.push(("directory", Box::new(DirectoryQuestionSource::new(dir))));
    }
    if let Some(url) = &args.api_url {
        sources.push(("server", Box::new(HttpQuestionSource::new(url)?)));
    }
    Ok(sources)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    if cmd == Command::Calc {
        return run_calculator(&parsed.positional);
    }

    // Open + migrate SQLite at startup so the services only ever see a ready store.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let clock = Clock::system();
    let config = QuizConfig::from_env();
    let library = QuizLibrary::new(Arc::clone(&storage.kv), clock.clone())
        .with_max_bytes(config.max_upload_bytes);

    match cmd {
        Command::Run => {
            let preferences =
                QuizPreferencesService::new(Arc::clone(&storage.kv), config.default_length);
            let length = match parsed.length {
                Some(length) => preferences.save_length(length).await?,
                None => preferences.load_length().await.unwrap_or(config.default_length),
            };

            let mut engine = QuizEngine::new(clock, Arc::clone(&storage.kv)).with_config(config);
            engine.subscribe(Arc::new(interactive::print_event));

            let identifier = &parsed.positional[0];
            load_quiz(&mut engine, &question_sources(&library, &parsed)?, identifier).await?;
            interactive::run_quiz(&mut engine, length).await?;
            Ok(())
        }
        Command::Import => {
            let path = PathBuf::from(&parsed.positional[0]);
            let content = std::fs::read_to_string(&path)?;
            let name = parsed.name.clone().unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let report = library.import_markdown(&name, &content).await?;
            println!(
                "{} quiz {:?}: {} question(s){}",
                if report.replaced { "Replaced" } else { "Imported" },
                report.quiz.name.as_str(),
                report.quiz.questions.len(),
                if report.skipped > 0 {
                    format!(", {} malformed block(s) skipped", report.skipped)
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Command::List => {
            for (label, source) in question_sources(&library, &parsed)? {
                match source.list_quizzes().await {
                    Ok(names) if names.is_empty() => println!("{label}: (none)"),
                    Ok(names) => {
                        println!("{label}:");
                        for name in names {
                            println!("  {name}");
                        }
                    }
                    Err(err) => eprintln!("{label}: {err}"),
                }
            }
            let engine = QuizEngine::new(clock, Arc::clone(&storage.kv));
            let in_progress = engine.saved_progress().await?;
            if !in_progress.is_empty() {
                println!("in progress:");
                for name in in_progress {
                    println!("  {name}");
                }
            }
            Ok(())
        }
        Command::Stats => {
            let engine = QuizEngine::new(clock, Arc::clone(&storage.kv));
            let stats = engine.lifetime_stats().await?;
            println!("Quizzes finished: {}", stats.total_quizzes);
            println!("Questions answered: {}", stats.total_questions);
            println!("Accuracy: {}%", stats.accuracy());
            println!("Time spent: {} min", stats.total_time_secs / 60);
            if let Some(last) = engine.last_result().await? {
                println!(
                    "Last quiz: {} {}/{} ({}%) on {}",
                    last.name,
                    last.score.correct,
                    last.score.answered,
                    last.score.percentage,
                    last.completed_at.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
        // Handled before storage is opened.
        Command::Calc => Ok(()),
    }
}

async fn load_quiz(
    engine: &mut QuizEngine,
    sources: &[(&'static str, Box<dyn QuestionSource>)],
    identifier: &str,
) -> Result<(), QuizError> {
    for (label, source) in sources {
        match engine.load_from_source(source.as_ref(), identifier).await {
            Ok(questions) => {
                log::info!("loaded {identifier:?} from {label} source");
                println!("Loaded {identifier} ({} questions)", questions.len());
                return Ok(());
            }
            Err(QuizError::Source(SourceError::NotFound(_))) => {
                log::debug!("{identifier:?} not found in {label} source");
            }
            Err(err) => return Err(err),
        }
    }
    Err(SourceError::NotFound(identifier.to_string()).into())
}

fn run_calculator(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let registry = CalculatorRegistry::with_builtins();
    let Some((id, pairs)) = args.split_first() else {
        for calc in registry.list() {
            println!("{:<10} {} ({})", calc.id(), calc.name(), calc.category());
        }
        return Ok(());
    };

    if !registry.contains(id) {
        let matches = registry.search(id);
        if !matches.is_empty() {
            eprintln!("unknown calculator {id:?}; did you mean:");
            for calc in matches {
                eprintln!("  {}", calc.id());
            }
        }
    }

    let inputs = CalculatorInputs::from_pairs(pairs.iter().map(String::as_str));
    let output = registry.calculate(id, &inputs)?;
    println!("{}: {}", output.label, output.score);
    println!("{}", output.interpretation);
    for line in output.details {
        println!("  - {line}");
    }
    Ok(())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
