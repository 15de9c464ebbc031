use std::fmt;
use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{
    AttemptResult, Difficulty, NewSession, QuestionId, SessionType, SessionUpdate, UserId,
};
use services::{ProgressAggregator, SessionStore, StatsComposer};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
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
    eprintln!("  cargo run -p app -- stats [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>] [--user <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://dev.sqlite3");
    eprintln!("  --user demo-user");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_USER_ID");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Stats,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "stats" => Some(Self::Stats),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    user_id: UserId,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("PREP_USER_ID")
            .ok()
            .and_then(|value| UserId::new(value).ok())
            .unwrap_or_else(|| UserId::new("demo-user").expect("default user id is non-empty"));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user_id = UserId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidUserId { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, user_id })
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

fn build_store(clock: Clock, storage: &Storage) -> SessionStore {
    let aggregator = ProgressAggregator::new(clock, Arc::clone(&storage.progress));
    SessionStore::new(clock, Arc::clone(&storage.sessions), aggregator)
}

async fn seed_demo_data(
    store: &SessionStore,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let arrays = store
        .create(
            NewSession::new(user_id.clone(), "arrays", Difficulty::Easy)
                .with_time_limit_mins(30)
                .with_questions(vec![
                    QuestionId::new("two-sum"),
                    QuestionId::new("best-time-to-buy-and-sell-stock"),
                ]),
        )
        .await?;
    store
        .update(
            arrays.id(),
            SessionUpdate {
                total_time_secs: Some(840),
                ..SessionUpdate::default()
            },
        )
        .await?;
    store
        .end(
            arrays.id(),
            vec![
                AttemptResult::new(QuestionId::new("two-sum"), true, 420, 1, 0, None)?,
                AttemptResult::new(
                    QuestionId::new("best-time-to-buy-and-sell-stock"),
                    false,
                    420,
                    2,
                    1,
                    None,
                )?,
            ],
        )
        .await?;

    let graphs = store
        .create(
            NewSession::new(user_id.clone(), "graphs", Difficulty::Medium)
                .with_session_type(SessionType::MockInterview)
                .with_questions(vec![QuestionId::new("clone-graph")]),
        )
        .await?;
    store
        .update(
            graphs.id(),
            SessionUpdate {
                total_time_secs: Some(1260),
                ..SessionUpdate::default()
            },
        )
        .await?;
    store
        .end(
            graphs.id(),
            vec![AttemptResult::new(
                QuestionId::new("clone-graph"),
                true,
                1260,
                1,
                2,
                None,
            )?],
        )
        .await?;

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: printing stats when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Stats,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Stats,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let clock = Clock::system();

    match cmd {
        Command::Stats => {
            let composer = StatsComposer::new(
                clock,
                Arc::clone(&storage.sessions),
                Arc::clone(&storage.progress),
            );
            let stats = composer.compute(&parsed.user_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Seed => {
            let store = build_store(clock, &storage);
            seed_demo_data(&store, &parsed.user_id).await?;
            eprintln!(
                "seed: created demo sessions for {} (db={}).",
                parsed.user_id, parsed.db_url
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
