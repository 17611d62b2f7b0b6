mod driver;

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use quiz_core::model::ChapterId;
use services::{AppServices, Clock};

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_CONTENT_DIR: &str = "content";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidChapter { raw: String },
    MissingChapter,
    MissingEntryId,
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidChapter { raw } => write!(f, "invalid --chapter value: {raw}"),
            ArgsError::MissingChapter => write!(f, "--chapter is required for this command"),
            ArgsError::MissingEntryId => write!(f, "a history entry id is required"),
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
    eprintln!("  quiz practice --chapter <n> [--db <sqlite_url>] [--content <dir>]");
    eprintln!("  quiz restart  --chapter <n>   # forget saved progress, then practice");
    eprintln!("  quiz exam                     # 60 random questions, 60 minutes");
    eprintln!("  quiz history");
    eprintln!("  quiz show <entry-id>");
    eprintln!("  quiz progress");
    eprintln!("  quiz clear                    # delete all results and progress");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --content {DEFAULT_CONTENT_DIR}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CONTENT_DIR, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Restart,
    Exam,
    History,
    Show,
    Progress,
    Clear,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "restart" => Some(Self::Restart),
            "exam" => Some(Self::Exam),
            "history" => Some(Self::History),
            "show" => Some(Self::Show),
            "progress" => Some(Self::Progress),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    content_dir: PathBuf,
    chapter: Option<ChapterId>,
    entry_id: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut content_dir = std::env::var_os("QUIZ_CONTENT_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR), PathBuf::from);
        let mut chapter = None;
        let mut entry_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--content" => {
                    content_dir = PathBuf::from(require_value(args, "--content")?);
                }
                "--chapter" => {
                    let value = require_value(args, "--chapter")?;
                    chapter = Some(parse_chapter(value)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if !arg.starts_with('-') && entry_id.is_none() => entry_id = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            content_dir,
            chapter,
            entry_id,
        })
    }

    fn require_chapter(&self) -> Result<ChapterId, ArgsError> {
        self.chapter.ok_or(ArgsError::MissingChapter)
    }
}

fn parse_chapter(raw: String) -> Result<ChapterId, ArgsError> {
    match raw.parse::<ChapterId>() {
        Ok(chapter) if chapter.is_known() => Ok(chapter),
        _ => Err(ArgsError::InvalidChapter { raw }),
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    debug!(?cmd, db = %parsed.db_url, content = %parsed.content_dir.display(), "starting");

    prepare_sqlite_file(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, &parsed.content_dir, Clock::system()).await?;

    match cmd {
        Command::Practice => {
            let mut flow = services.workflow();
            flow.start_practice(parsed.require_chapter()?).await?;
            driver::run_session(&mut flow).await
        }
        Command::Restart => {
            let mut flow = services.workflow();
            flow.restart_chapter(parsed.require_chapter()?).await?;
            driver::run_session(&mut flow).await
        }
        Command::Exam => {
            let mut flow = services.workflow();
            flow.start_exam()?;
            driver::run_session(&mut flow).await
        }
        Command::History => {
            driver::print_history(&services.history().load().await);
            Ok(())
        }
        Command::Show => {
            let id = parsed.entry_id.as_deref().ok_or(ArgsError::MissingEntryId)?;
            let history = services.history();
            match history.find_entry(id).await {
                Some(entry) => driver::print_entry(&entry, history.bank()),
                None => println!("No history entry with id {id}."),
            }
            Ok(())
        }
        Command::Progress => {
            driver::print_progress(&services).await;
            Ok(())
        }
        Command::Clear => {
            services.history().clear_all().await?;
            println!("History cleared.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(&mut iter)
    }

    #[test]
    fn chapter_must_be_a_known_chapter() {
        let args = parse(&["--chapter", " 2 "]).unwrap();
        assert_eq!(args.chapter, Some(ChapterId::new(2)));
        assert!(matches!(
            parse(&["--chapter", "7"]),
            Err(ArgsError::InvalidChapter { .. })
        ));
        assert!(matches!(
            parse(&["--chapter"]),
            Err(ArgsError::MissingValue { flag: "--chapter" })
        ));
    }

    #[test]
    fn positional_argument_is_the_entry_id() {
        let args = parse(&["exam_1700000000000", "--content", "data"]).unwrap();
        assert_eq!(args.entry_id.as_deref(), Some("exam_1700000000000"));
        assert_eq!(args.content_dir, PathBuf::from("data"));
        assert!(matches!(
            parse(&["a", "b"]),
            Err(ArgsError::UnknownArg(arg)) if arg == "b"
        ));
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/quiz.db".into()),
            "sqlite:///tmp/quiz.db"
        );
        assert!(normalize_sqlite_url("quiz.db".into()).starts_with("sqlite:///"));
    }
}
