use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use services::{AppServices, Clock, LessonService, SessionProvider};
use storage::remote::BackendConfig;
use ui::{App, UiApp, build_app_context};

const DEFAULT_SESSION_DB: &str = "sqlite://lms-session.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSetting { flag: &'static str, env: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSetting { flag, env } => {
                write!(f, "missing {flag} (or set {env})")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --session-db value: {raw}"),
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

struct DesktopApp {
    services: AppServices,
}

impl UiApp for DesktopApp {
    fn session(&self) -> Arc<SessionProvider> {
        self.services.session()
    }

    fn lessons(&self) -> Arc<LessonService> {
        self.services.lessons()
    }
}

struct Args {
    backend_url: String,
    anon_key: String,
    session_db: String,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --backend-url <url> --anon-key <key> [--session-db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --session-db {DEFAULT_SESSION_DB}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_BACKEND_URL, LMS_ANON_KEY, LMS_SESSION_DB, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut backend_url = env_setting("LMS_BACKEND_URL");
        let mut anon_key = env_setting("LMS_ANON_KEY");
        let mut session_db =
            env_setting("LMS_SESSION_DB").unwrap_or_else(|| DEFAULT_SESSION_DB.into());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--backend-url" => backend_url = Some(require_value(args, "--backend-url")?),
                "--anon-key" => anon_key = Some(require_value(args, "--anon-key")?),
                "--session-db" => {
                    let value = require_value(args, "--session-db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    session_db = value;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            backend_url: backend_url.ok_or(ArgsError::MissingSetting {
                flag: "--backend-url",
                env: "LMS_BACKEND_URL",
            })?,
            anon_key: anon_key.ok_or(ArgsError::MissingSetting {
                flag: "--anon-key",
                env: "LMS_ANON_KEY",
            })?,
            session_db: normalize_sqlite_url(session_db),
        })
    }
}

fn env_setting(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite:///") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).inspect_err(|_| print_usage())?;

    let config = BackendConfig::new(&args.backend_url, args.anon_key)?;

    // The session store must exist before the window opens.
    prepare_sqlite_file(&args.session_db)?;
    let services = AppServices::connect(config, &args.session_db, Clock::default()).await?;
    log::info!("session store at {}", args.session_db);

    let app: Arc<dyn UiApp> = Arc::new(DesktopApp { services });
    let context = build_app_context(&app);

    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("LMS")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
