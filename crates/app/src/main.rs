use std::fmt;
use std::path::PathBuf;

use quiz_core::model::PracticeSessionDraft;
use services::{AdjustmentReport, AppServices, Clock, SkippedEntry};
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";
const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSession,
    UnknownArg(String),
    UnknownSubcommand(String),
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSession => write!(f, "submit requires --session <path>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownSubcommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Submit,
    Show,
    History,
    Wrong,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "submit" => Some(Self::Submit),
            "show" => Some(Self::Show),
            "history" => Some(Self::History),
            "wrong" => Some(Self::Wrong),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    command: Command,
    db_url: String,
    limit: u32,
    session: Option<PathBuf>,
}

fn parse_limit(raw: String) -> Result<u32, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgsError::InvalidLimit { raw }),
    }
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let command = match args.next() {
            None => return Ok(None),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => {
                Command::from_arg(&first).ok_or(ArgsError::UnknownSubcommand(first))?
            }
        };

        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());
        let mut limit = match std::env::var("QUIZ_HISTORY_LIMIT") {
            Ok(raw) => parse_limit(raw)?,
            Err(_) => DEFAULT_LIMIT,
        };
        let mut session = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--limit" => limit = parse_limit(require_value(&mut args, "--limit")?)?,
                "--session" if command == Command::Submit => {
                    session = Some(PathBuf::from(require_value(&mut args, "--session")?));
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Submit && session.is_none() {
            return Err(ArgsError::MissingSession);
        }

        Ok(Some(Self {
            command,
            db_url,
            limit,
            session,
        }))
    }
}

fn usage() -> String {
    format!(
        "Usage:
  cargo run -p app -- submit  --session <file.json> [--db <sqlite_url>]
  cargo run -p app -- show    [--db <sqlite_url>] [--limit <n>]
  cargo run -p app -- history [--db <sqlite_url>] [--limit <n>]
  cargo run -p app -- wrong   [--db <sqlite_url>] [--limit <n>]

Defaults:
  --db {DEFAULT_DB_URL}
  --limit {DEFAULT_LIMIT}

Environment:
  QUIZ_DB_URL, QUIZ_HISTORY_LIMIT, RUST_LOG (default: info)"
    )
}

fn print_usage() {
    eprintln!("{}", usage());
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    log_fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &AdjustmentReport) {
    match (report.accuracy_rate, report.tier) {
        (Some(rate), Some(tier)) => {
            println!("accuracy {rate:.1}% ({})", tier.as_str());
        }
        _ => println!("no questions answered; difficulties unchanged"),
    }
    for change in &report.applied {
        let previous = change
            .previous
            .map_or_else(|| "absent".to_owned(), |d| d.to_string());
        println!(
            "  {:<24} {previous:>6} -> {} ({:+})",
            change.question_id, change.current, change.individual_adjustment
        );
    }
    for skipped in &report.skipped {
        match skipped {
            SkippedEntry::Malformed { index, reason } => {
                println!("  entry #{index:<17} skipped: {reason}");
            }
            SkippedEntry::Read { question_id, error }
            | SkippedEntry::Write { question_id, error } => {
                println!("  {question_id:<24} skipped: {error}");
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // `main` reports the error itself
    let Some(args) = Args::parse(std::env::args().skip(1)).inspect_err(|_| print_usage())?
    else {
        print_usage();
        return Ok(());
    };

    init_logging();
    let services = AppServices::new_sqlite(&args.db_url, Clock::default()).await?;

    match args.command {
        Command::Submit => {
            let path = args.session.ok_or(ArgsError::MissingSession)?;
            let raw = std::fs::read_to_string(&path)?;
            let draft: PracticeSessionDraft = serde_json::from_str(&raw)?;
            let submitted = services.practice_sessions().submit(draft).await?;

            println!("saved session {}", submitted.session.id());
            match &submitted.adjustment {
                Some(report) => print_report(report),
                None => println!("question payload unreadable; difficulties unchanged"),
            }
            for question_id in &submitted.wrong_questions_added {
                println!("  {question_id:<24} added to wrong-question list");
            }
        }
        Command::Show => {
            let questions = services.questions().list_questions(args.limit).await?;
            for question in questions {
                let difficulty = question
                    .difficulty()
                    .map_or_else(|| "-".to_owned(), |d| d.to_string());
                println!("{:<24} {difficulty:>2}  {}", question.id(), question.prompt());
            }
        }
        Command::History => {
            let sessions = services.practice_sessions().history(args.limit).await?;
            for session in sessions {
                println!(
                    "{}  {:<36} {:<10} {}/{}",
                    session.created_at().to_rfc3339(),
                    session.id(),
                    session.mode(),
                    session.correct_count(),
                    session.total_questions()
                );
            }
        }
        Command::Wrong => {
            let entries = services.practice_sessions().wrong_questions(args.limit).await?;
            for entry in entries {
                println!(
                    "{}  {:<24} {}",
                    entry.added_at().to_rfc3339(),
                    entry.question_id(),
                    entry.notes().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> impl Iterator<Item = String> {
        items
            .iter()
            .map(|s| (*s).to_owned())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn submit_requires_session_path() {
        let err = Args::parse(argv(&["submit", "--db", "sqlite::memory:"])).unwrap_err();
        assert!(matches!(err, ArgsError::MissingSession));
    }

    #[test]
    fn parses_submit_flags() {
        let args = Args::parse(argv(&[
            "submit",
            "--session",
            "s.json",
            "--db",
            "sqlite:x.db",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(args.command, Command::Submit);
        assert_eq!(args.db_url, "sqlite:x.db");
        assert_eq!(args.session, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn rejects_zero_limit_and_unknown_flags() {
        assert!(matches!(
            Args::parse(argv(&["history", "--db", "sqlite:x.db", "--limit", "0"])),
            Err(ArgsError::InvalidLimit { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["show", "--session", "s.json"])),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["launch"])),
            Err(ArgsError::UnknownSubcommand(_))
        ));
    }

    #[test]
    fn help_and_empty_argv_print_usage() {
        assert!(Args::parse(argv(&[])).unwrap().is_none());
        assert!(Args::parse(argv(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn parses_wrong_question_listing() {
        let args = Args::parse(argv(&["wrong", "--db", "sqlite:x.db", "--limit", "5"]))
            .unwrap()
            .unwrap();
        assert_eq!(args.command, Command::Wrong);
        assert_eq!(args.limit, 5);
    }

    #[test]
    fn usage_text_leaves_the_error_to_main() {
        let err = Args::parse(argv(&["launch"])).unwrap_err();
        let message = err.to_string();
        assert_eq!(message, "unknown subcommand: launch");
        assert!(!usage().contains(&message));
        assert!(usage().starts_with("Usage:"));
    }
}
