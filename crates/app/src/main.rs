use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use eduplay_core::ladder::TopicStatus;
use eduplay_core::model::{Avatar, PathName, SignUpDraft, Topic};
use services::{
    AppServices, Clock, ProgressEvent, ProgressEvents, RemoteConfig, SessionContext,
};
use storage::SessionStore;
use storage::repository::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
    InvalidAvatar { raw: String },
    InvalidPath { raw: String },
    InvalidTopic { raw: String },
    MissingRemote,
    NotSignedIn,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
            ArgsError::InvalidAvatar { raw } => write!(f, "invalid --avatar value: {raw}"),
            ArgsError::InvalidPath { raw } => write!(f, "invalid --path value: {raw}"),
            ArgsError::InvalidTopic { raw } => write!(f, "invalid --topic value: {raw}"),
            ArgsError::MissingRemote => {
                write!(f, "no remote store configured (set EDUPLAY_REMOTE_URL or --remote)")
            }
            ArgsError::NotSignedIn => write!(f, "not signed in; run `login` first"),
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
    eprintln!("  cargo run -p app -- signup --email <e> --password <p> --confirm <p> --name <n> --avatar <id>");
    eprintln!("  cargo run -p app -- login --email <e> --password <p>");
    eprintln!("  cargo run -p app -- logout");
    eprintln!("  cargo run -p app -- whoami");
    eprintln!("  cargo run -p app -- ladder --path <css|javascript>");
    eprintln!("  cargo run -p app -- toggle --path <css|javascript> --topic <name>");
    eprintln!("  cargo run -p app -- leaderboard");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>      default sqlite://eduplay.sqlite3");
    eprintln!("  --remote <base_url>    remote user collection");
    eprintln!("  --timeout <secs>       default 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDUPLAY_DB_URL, EDUPLAY_REMOTE_URL, EDUPLAY_REMOTE_TIMEOUT_SECS, RUST_LOG");
    eprintln!();
    eprintln!("Avatars:");
    for avatar in Avatar::presets() {
        eprintln!("  {}: {} / {} / {} / {}", avatar.id, avatar.face, avatar.hair, avatar.mouth, avatar.color);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    SignUp,
    LogIn,
    LogOut,
    WhoAmI,
    Ladder,
    Toggle,
    Leaderboard,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "signup" => Some(Self::SignUp),
            "login" => Some(Self::LogIn),
            "logout" => Some(Self::LogOut),
            "whoami" => Some(Self::WhoAmI),
            "ladder" => Some(Self::Ladder),
            "toggle" => Some(Self::Toggle),
            "leaderboard" => Some(Self::Leaderboard),
            _ => None,
        }
    }

    fn needs_remote(&self) -> bool {
        !matches!(self, Self::LogOut | Self::WhoAmI)
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: String,
    remote: Option<RemoteConfig>,
    email: Option<String>,
    password: Option<String>,
    confirm: Option<String>,
    name: Option<String>,
    avatar: Option<u32>,
    path: Option<PathName>,
    topic: Option<Topic>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("EDUPLAY_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://eduplay.sqlite3".into(), normalize_sqlite_url),
            remote: RemoteConfig::from_env(),
            ..Self::default()
        };
        let mut timeout = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--remote" => {
                    let value = require_value(args, "--remote")?;
                    parsed.remote = Some(RemoteConfig::with_env_timeout(value.trim()));
                }
                "--timeout" => {
                    let value = require_value(args, "--timeout")?;
                    let secs = value
                        .parse::<u64>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or_else(|| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    timeout = Some(Duration::from_secs(secs));
                }
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--confirm" => parsed.confirm = Some(require_value(args, "--confirm")?),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--avatar" => {
                    let value = require_value(args, "--avatar")?;
                    let id = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidAvatar { raw: value.clone() })?;
                    parsed.avatar = Some(id);
                }
                "--path" => {
                    let value = require_value(args, "--path")?;
                    let path = value
                        .parse::<PathName>()
                        .map_err(|_| ArgsError::InvalidPath { raw: value.clone() })?;
                    parsed.path = Some(path);
                }
                "--topic" => {
                    let value = require_value(args, "--topic")?;
                    let topic =
                        Topic::new(value.clone()).map_err(|_| ArgsError::InvalidTopic { raw: value })?;
                    parsed.topic = Some(topic);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if let (Some(remote), Some(timeout)) = (parsed.remote.as_mut(), timeout) {
            remote.timeout = timeout;
        }
        Ok(parsed)
    }

    fn required<T: Clone>(value: &Option<T>, flag: &'static str) -> Result<T, ArgsError> {
        value.clone().ok_or(ArgsError::MissingFlag { flag })
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

/// Prints what a UI would show for each progress signal.
struct ConsoleEvents;

impl ProgressEvents for ConsoleEvents {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ProgressChanged { path, progress } => {
                debug!(%path, progress = progress.progress, "progress changed");
            }
            ProgressEvent::NavigateToLesson(route) => {
                println!("-> open lesson \"{}\" ({})", route.topic, route.path);
            }
            ProgressEvent::Error { message } => eprintln!("error: {message}"),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;

    if !cmd.needs_remote() {
        let storage = Storage::sqlite(&parsed.db_url).await?;
        let sessions = SessionStore::new(Arc::clone(&storage.kv));
        return match cmd {
            Command::LogOut => {
                sessions.clear().await?;
                println!("signed out");
                Ok(())
            }
            _ => {
                match sessions.load().await.ok().flatten() {
                    Some(stored) => print_user(&SessionContext::from(stored)),
                    None => println!("not signed in"),
                }
                Ok(())
            }
        };
    }

    let remote = parsed.remote.clone().ok_or(ArgsError::MissingRemote)?;
    let app = AppServices::new_sqlite(
        &parsed.db_url,
        &remote,
        Clock::default_clock(),
        Arc::new(ConsoleEvents),
    )
    .await?;

    match cmd {
        Command::SignUp => {
            let draft = SignUpDraft {
                email: Args::required(&parsed.email, "--email")?,
                password: Args::required(&parsed.password, "--password")?,
                confirm_password: Args::required(&parsed.confirm, "--confirm")?,
                full_name: Args::required(&parsed.name, "--name")?,
                avatar_id: parsed.avatar,
            };
            let ctx = app.accounts().sign_up(draft).await?;
            println!("account created for {}; run `login` to sign in", ctx.user.email);
        }
        Command::LogIn => {
            let email = Args::required(&parsed.email, "--email")?;
            let password = Args::required(&parsed.password, "--password")?;
            let ctx = app.accounts().log_in(&email, &password).await?;
            print_user(&ctx);
        }
        Command::Ladder => {
            let path = Args::required(&parsed.path, "--path")?;
            let mut ctx = signed_in(&app).await?;
            let loaded = app.progress().load_progress(&mut ctx, &path).await?;
            println!("{path}: {:.2}% ({:?})", loaded.progress.progress, loaded.source);
            for step in app.progress().ladder(&ctx, &path).await? {
                let mark = match step.status() {
                    TopicStatus::Completed => "[x]",
                    TopicStatus::Available => "[ ]",
                    TopicStatus::Locked => " # ",
                };
                println!("{mark} {:>3}. {}", step.index + 1, step.topic);
            }
        }
        Command::Toggle => {
            let path = Args::required(&parsed.path, "--path")?;
            let topic = Args::required(&parsed.topic, "--topic")?;
            let mut ctx = signed_in(&app).await?;
            let pressed = app
                .progress()
                .handle_topic_press(&mut ctx, &path, &topic)
                .await?;
            println!(
                "{topic}: {:?}; {path} {:.2}%, overall {} topics ({:.2}%)",
                pressed.kind,
                pressed.progress.progress,
                pressed.aggregate.total_topics,
                pressed.aggregate.total_progress
            );
        }
        Command::Leaderboard => {
            for entry in app.leaderboard().leaderboard().await? {
                println!(
                    "{:>3}. {:<24} {:>4} topics  {:>6.2}%",
                    entry.rank, entry.name, entry.total_topics, entry.total_progress
                );
            }
        }
        Command::LogOut | Command::WhoAmI => {}
    }
    Ok(())
}

async fn signed_in(app: &AppServices) -> Result<SessionContext, Box<dyn std::error::Error>> {
    Ok(app
        .accounts()
        .restore_session()
        .await?
        .ok_or(ArgsError::NotSignedIn)?)
}

fn print_user(ctx: &SessionContext) {
    println!(
        "{} <{}>: {} topics, {:.2}%",
        ctx.user.display_name(),
        ctx.user.email,
        ctx.user.total_topics,
        ctx.user.total_progress
    );
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
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_toggle_flags() {
        let args = parse(&["--path", "css", "--topic", "CSS HOME", "--remote", "http://x.test"]).unwrap();
        assert_eq!(args.path, Some(PathName::css()));
        assert_eq!(args.topic.map(|t| t.to_string()).as_deref(), Some("CSS HOME"));
        assert_eq!(args.remote.map(|r| r.base_url).as_deref(), Some("http://x.test"));
    }

    #[test]
    fn remote_flag_keeps_environment_timeout() {
        let args = parse(&["--remote", "http://x.test"]).unwrap();
        let expected = RemoteConfig::with_env_timeout("http://x.test");
        assert_eq!(args.remote, Some(expected));
    }

    #[test]
    fn timeout_applies_to_remote() {
        let args = parse(&["--remote", "http://x.test", "--timeout", "3"]).unwrap();
        assert_eq!(args.remote.unwrap().timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(parse(&["--path", "CSS!"]), Err(ArgsError::InvalidPath { .. })));
        assert!(matches!(parse(&["--timeout", "0"]), Err(ArgsError::InvalidTimeout { .. })));
        assert!(matches!(parse(&["--avatar"]), Err(ArgsError::MissingValue { .. })));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/app.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/app.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
