use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, Question, QuestionId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
    unscored: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut now: Option<DateTime<Utc>> = None;
        let mut unscored = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--unscored" => unscored = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            now,
            unscored,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  --unscored                Insert questions without a difficulty");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL");
}

// (id, prompt, answer, explanation, difficulty)
const DEMO_QUESTIONS: [(&str, &str, &str, &str, i64); 6] = [
    (
        "demo-math-1",
        "What is the value of x in the equation 2x + 5 = 15?",
        "x = 5",
        "2x + 5 = 15, so 2x = 10 and x = 5",
        2,
    ),
    (
        "demo-math-2",
        "What is the area of a circle with radius 4 units?",
        "16π square units",
        "Area = πr² = π(4)² = 16π",
        3,
    ),
    (
        "demo-sci-1",
        "What is the chemical symbol for gold?",
        "Au",
        "From the Latin word 'aurum'",
        2,
    ),
    (
        "demo-sci-2",
        "Which planet is known as the Red Planet?",
        "Mars",
        "Iron oxide on its surface gives Mars its color",
        1,
    ),
    (
        "demo-hist-1",
        "In which year did World War II end?",
        "1945",
        "Germany surrendered in May and Japan in September 1945",
        3,
    ),
    (
        "demo-cs-1",
        "What is the time complexity of binary search?",
        "O(log n)",
        "Each step halves the remaining search space",
        4,
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().inspect_err(|_| print_usage())?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for (id, prompt, answer, explanation, difficulty) in DEMO_QUESTIONS {
        let difficulty = if args.unscored {
            None
        } else {
            Some(Difficulty::new(difficulty)?)
        };
        let question = Question::new(QuestionId::new(id), prompt, answer, difficulty, now)?
            .with_explanation(explanation);
        storage.questions.upsert_question(&question).await?;
    }

    println!(
        "Seeded {} demo questions into {}",
        DEMO_QUESTIONS.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
