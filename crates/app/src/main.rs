use std::fmt;
use std::sync::Arc;

use progress_core::model::{
    AuthToken, CategoryKey, ChapterKey, Curriculum, ProgressPath, ProgressStatus, StatusIcon,
    UserId,
};
use services::{
    Anonymous, AppServices, ChapterStatusSession, Clock, Identity, IdentityProvider,
    SelectOutcome, StaticIdentity,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPath { raw: String, reason: String },
    InvalidStatus { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPath { raw, reason } => write!(f, "invalid path {raw}: {reason}"),
            ArgsError::InvalidStatus { raw } => {
                write!(f, "invalid status {raw} (expected not-started, in-progress or completed)")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn require_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Status,
    Set,
    Dashboard,
    RecordFrq,
    RecordMcq,
}

impl CommandKind {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "set" => Some(Self::Set),
            "dashboard" => Some(Self::Dashboard),
            "record-frq" => Some(Self::RecordFrq),
            "record-mcq" => Some(Self::RecordMcq),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Command {
    Status {
        path: ProgressPath,
    },
    Set {
        path: ProgressPath,
        status: ProgressStatus,
    },
    Dashboard {
        category: Option<CategoryKey>,
    },
    RecordFrq {
        category: CategoryKey,
        chapter: ChapterKey,
        item: u32,
        score: u32,
        max_score: u32,
    },
    RecordMcq {
        category: CategoryKey,
        chapter: ChapterKey,
        correct: u32,
        total: u32,
    },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: Option<String>,
    token: Option<String>,
    curriculum: Option<String>,
    command: Command,
}

#[derive(Debug, Default)]
struct Numbers {
    item: Option<u32>,
    score: Option<u32>,
    max_score: Option<u32>,
    correct: Option<u32>,
    total: Option<u32>,
}

impl Args {
    fn parse(kind: CommandKind, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PROGRESS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("PROGRESS_USER_ID").ok();
        let mut token = std::env::var("PROGRESS_TOKEN").ok();
        let mut curriculum = std::env::var("PROGRESS_CURRICULUM").ok();
        let mut category = None;
        let mut numbers = Numbers::default();
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user_id = Some(require_value(args, "--user")?),
                "--token" => token = Some(require_value(args, "--token")?),
                "--curriculum" => curriculum = Some(require_value(args, "--curriculum")?),
                "--category" => {
                    let value = require_value(args, "--category")?;
                    category = Some(CategoryKey::new(&value).map_err(|e| {
                        ArgsError::InvalidPath {
                            raw: value.clone(),
                            reason: e.to_string(),
                        }
                    })?);
                }
                "--item" => numbers.item = Some(require_number(args, "--item")?),
                "--score" => numbers.score = Some(require_number(args, "--score")?),
                "--max" => numbers.max_score = Some(require_number(args, "--max")?),
                "--correct" => numbers.correct = Some(require_number(args, "--correct")?),
                "--total" => numbers.total = Some(require_number(args, "--total")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        if user_id.is_some() && token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ArgsError::MissingArgument { name: "--token" });
        }
        let command = build_command(kind, positional, category, &numbers)?;
        Ok(Self {
            db_url,
            user_id,
            token,
            curriculum,
            command,
        })
    }

    fn identity(&self) -> Arc<dyn IdentityProvider> {
        match (&self.user_id, &self.token) {
            (Some(user_id), Some(token)) => Arc::new(StaticIdentity::signed_in(Identity::new(
                UserId::new(user_id.as_str()),
                AuthToken::new(token.as_str()),
            ))),
            _ => Arc::new(Anonymous),
        }
    }
}

fn build_command(
    kind: CommandKind,
    positional: Vec<String>,
    category: Option<CategoryKey>,
    numbers: &Numbers,
) -> Result<Command, ArgsError> {
    let mut positional = positional.into_iter();
    let mut extra = |name: &'static str| positional.next().ok_or(ArgsError::MissingArgument { name });
    let missing = |name: &'static str| ArgsError::MissingArgument { name };

    let command = match kind {
        CommandKind::Status => Command::Status {
            path: parse_path(&extra("category/chapter/type")?)?,
        },
        CommandKind::Set => {
            let path = parse_path(&extra("category/chapter/type")?)?;
            let raw = extra("status")?;
            let status = raw
                .parse::<ProgressStatus>()
                .map_err(|_| ArgsError::InvalidStatus { raw: raw.clone() })?;
            Command::Set { path, status }
        }
        CommandKind::Dashboard => Command::Dashboard { category },
        CommandKind::RecordFrq => {
            let (category, chapter) = parse_chapter(&extra("category/chapter")?)?;
            Command::RecordFrq {
                category,
                chapter,
                item: numbers.item.ok_or_else(|| missing("--item"))?,
                score: numbers.score.ok_or_else(|| missing("--score"))?,
                max_score: numbers.max_score.ok_or_else(|| missing("--max"))?,
            }
        }
        CommandKind::RecordMcq => {
            let (category, chapter) = parse_chapter(&extra("category/chapter")?)?;
            Command::RecordMcq {
                category,
                chapter,
                correct: numbers.correct.ok_or_else(|| missing("--correct"))?,
                total: numbers.total.ok_or_else(|| missing("--total"))?,
            }
        }
    };

    if let Some(arg) = positional.next() {
        return Err(ArgsError::UnknownArg(arg));
    }
    Ok(command)
}

fn parse_path(raw: &str) -> Result<ProgressPath, ArgsError> {
    ProgressPath::parse(raw).map_err(|e| ArgsError::InvalidPath {
        raw: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn parse_chapter(raw: &str) -> Result<(CategoryKey, ChapterKey), ArgsError> {
    let invalid = |reason: String| ArgsError::InvalidPath {
        raw: raw.to_owned(),
        reason,
    };
    let (category, chapter) = raw
        .trim_matches('/')
        .split_once('/')
        .ok_or_else(|| invalid("expected <category>/<chapter>".into()))?;
    Ok((
        CategoryKey::new(category).map_err(|e| invalid(e.to_string()))?,
        ChapterKey::new(chapter).map_err(|e| invalid(e.to_string()))?,
    ))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app status <category>/<chapter>/<type> [options]");
    eprintln!("  app set <category>/<chapter>/<type> <status> [options]");
    eprintln!("  app dashboard [--category <key>] [options]");
    eprintln!("  app record-frq <category>/<chapter> --item <n> --score <n> --max <n> [options]");
    eprintln!("  app record-mcq <category>/<chapter> --correct <n> --total <n> [options]");
    eprintln!();
    eprintln!("Types: slide, mcq, frq");
    eprintln!("Statuses: not-started, in-progress, completed");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://dev.sqlite3, env PROGRESS_DB_URL)");
    eprintln!("  --user <id>               Signed-in user id (env PROGRESS_USER_ID)");
    eprintln!("  --token <token>           Auth token, required with --user (env PROGRESS_TOKEN)");
    eprintln!("  --curriculum <path>       Curriculum JSON (env PROGRESS_CURRICULUM; default: built-in micro)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG (default: info).");
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

fn load_curriculum(path: Option<&str>) -> Result<Curriculum, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(Curriculum::from_json(&json)?)
        }
        None => Ok(Curriculum::micro()),
    }
}

fn icon_glyph(icon: StatusIcon) -> &'static str {
    match icon {
        StatusIcon::Cross => "✗",
        StatusIcon::OpenBook => "📖",
        StatusIcon::Check => "✓",
    }
}

fn print_selector(session: &ChapterStatusSession) {
    let path = session.path();
    if session.is_suspended() {
        println!("{}/{}/{}: sign in to track progress", path.category, path.chapter, path.content_type);
        return;
    }
    println!("{}/{}/{}", path.category, path.chapter, path.content_type);
    for option in session.options() {
        let marker = if option.selected { ">" } else { " " };
        println!("{marker} {} {}", icon_glyph(option.icon), option.label);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let kind = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingArgument { name: "command" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => CommandKind::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = Args::parse(kind, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let curriculum = load_curriculum(parsed.curriculum.as_deref())?;
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(
        &parsed.db_url,
        Clock::default(),
        curriculum,
        parsed.identity(),
    )
    .await?;

    match parsed.command {
        Command::Status { path } => {
            let session = app.status().mount(path).await?;
            print_selector(&session);
        }
        Command::Set { path, status } => {
            let service = app.status();
            let session = service.mount(path).await?;
            match service.select(&session, status).await? {
                SelectOutcome::Suspended => {
                    return Err("sign in (--user) to record progress".into());
                }
                SelectOutcome::Unchanged => println!("already {}", status.label()),
                SelectOutcome::Ignored | SelectOutcome::Queued | SelectOutcome::Synced(_) => {}
            }
            print_selector(&session);
        }
        Command::Dashboard { category } => {
            let category = match category {
                Some(category) => category,
                None => app
                    .curriculum()
                    .categories()
                    .first()
                    .map(|c| c.key().clone())
                    .ok_or("curriculum has no categories")?,
            };
            match app.dashboard().load(&category).await? {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                None => return Err("sign in (--user) to view the dashboard".into()),
            }
        }
        Command::RecordFrq {
            category,
            chapter,
            item,
            score,
            max_score,
        } => {
            let id = app
                .scores()
                .record_frq(&category, &chapter, item, score, max_score)
                .await?;
            println!("recorded frq score {id}");
        }
        Command::RecordMcq {
            category,
            chapter,
            correct,
            total,
        } => {
            let id = app
                .scores()
                .record_mcq(&category, &chapter, correct, total)
                .await?;
            println!("recorded mcq score {id}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %err, "command failed");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
