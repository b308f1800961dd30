use std::fmt;
use std::sync::Arc;

use course_core::model::{Course, CourseId, LessonState};
use course_core::NavigationEngine;
use services::{ProgressStoreClient, SessionContext, TracingNotifier, ViewerConfig};
use storage::repository::Storage;
use storage::token::{InMemoryTokenStore, TokenStore};
use storage::BackendConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
struct LoginRequired;

impl fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("login required: run `login` and export LEARN_AUTH_TOKEN")
    }
}

impl std::error::Error for LoginRequired {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- outline  --course <id> [--api <url>]");
    eprintln!("  cargo run -p app -- progress --course <id> [--api <url>]");
    eprintln!("  cargo run -p app -- login    --email <email> --password <password> [--api <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api http://localhost:8000/api");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_API_BASE_URL, LEARN_API_TIMEOUT_SECS, LEARN_AUTH_TOKEN,");
    eprintln!("  LEARN_LOCK_POLICY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Outline,
    Progress,
    Login,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "outline" => Some(Self::Outline),
            "progress" => Some(Self::Progress),
            "login" => Some(Self::Login),
            _ => None,
        }
    }
}

struct Args {
    backend: BackendConfig,
    course_id: Option<CourseId>,
    email: Option<String>,
    password: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            backend: BackendConfig::from_env(),
            course_id: None,
            email: None,
            password: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => {
                    let value = require_value(args, "--course")?;
                    let id = value
                        .parse::<CourseId>()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    parsed.course_id = Some(id);
                }
                "--api" => {
                    let value = require_value(args, "--api")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    parsed.backend.base_url = value;
                }
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--password" => parsed.password = Some(require_value(args, "--password")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn course(&self) -> Result<CourseId, ArgsError> {
        self.course_id.ok_or(ArgsError::MissingFlag { flag: "--course" })
    }
}

fn token_store() -> Arc<dyn TokenStore> {
    match std::env::var("LEARN_AUTH_TOKEN") {
        Ok(token) => Arc::new(InMemoryTokenStore::with_token(token)),
        Err(_) => Arc::new(InMemoryTokenStore::new()),
    }
}

fn print_outline(course: &Course) {
    println!("{} (course {})", course.title(), course.id());
    if let Some(description) = course.description() {
        println!("  {description}");
    }
    for level in course.levels() {
        println!("{}", level.name());
        for module in level.modules() {
            println!("  {}", module.name());
            for lesson in module.lessons() {
                let video = if lesson.has_video() {
                    ""
                } else {
                    "  [video unavailable]"
                };
                println!(
                    "    {:>6}  {:<40} {:>8}{video}",
                    lesson.id(),
                    lesson.title(),
                    lesson.duration()
                );
            }
        }
    }
}

fn print_progress(engine: &NavigationEngine) {
    let course = engine.course();
    println!("{} (course {})", course.title(), course.id());
    for module in course.modules() {
        println!(
            "  {:<40} {:>5.1}%",
            module.name(),
            engine.module_progress(module.id())
        );
        for lesson in module.lessons() {
            let state = match engine.state(lesson.id()) {
                LessonState::NotStarted => "not started",
                LessonState::InProgress => "in progress",
                LessonState::Completed => "completed",
            };
            let locked = if engine.is_locked(lesson.id()) {
                "  [locked]"
            } else {
                ""
            };
            println!(
                "    {:<38} {:>5.1}%  {state}{locked}",
                lesson.title(),
                engine.lesson_percent(lesson.id())
            );
        }
    }
    let standing = engine.standing();
    println!(
        "Course progress: {:.1}% ({:?})",
        standing.progress, standing.status
    );
}

async fn load_course(storage: &Storage, id: CourseId) -> Result<Course, Box<dyn std::error::Error>> {
    let raw = storage.courses.get_structure(id).await?;
    Ok(Course::normalize(raw)?)
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

    let tokens = token_store();
    let session = SessionContext::new(Arc::clone(&tokens));
    let storage = Storage::http(parsed.backend.clone(), tokens)?;
    info!(base_url = %parsed.backend.base_url, ?cmd, "backend configured");

    match cmd {
        Command::Outline => {
            let course = load_course(&storage, parsed.course()?).await?;
            print_outline(&course);
            Ok(())
        }
        Command::Progress => {
            let course_id = parsed.course()?;
            if !session.is_authenticated() {
                return Err(LoginRequired.into());
            }
            let config = ViewerConfig::from_env();
            let course = load_course(&storage, course_id).await?;
            let store = ProgressStoreClient::new(
                Arc::clone(&storage.progress),
                Arc::new(TracingNotifier),
            );
            let mut engine = NavigationEngine::new(course, config.lock_policy);
            let lessons: Vec<_> = engine.sequence().lessons().iter().map(|l| l.id()).collect();
            for lesson in lessons {
                let progress = store.fetch_progress(lesson).await;
                engine.load_remote(lesson, progress)?;
            }
            print_progress(&engine);
            Ok(())
        }
        Command::Login => {
            let email = parsed
                .email
                .ok_or(ArgsError::MissingFlag { flag: "--email" })?;
            let password = parsed
                .password
                .ok_or(ArgsError::MissingFlag { flag: "--password" })?;
            let user = session
                .sign_in(storage.auth.as_ref(), &email, &password)
                .await?;
            if let Some(user) = user {
                eprintln!(
                    "signed in as {}",
                    user.full_name.as_deref().unwrap_or(&user.email)
                );
            }
            if let Some(token) = session.tokens().token() {
                println!("{token}");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,services=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
