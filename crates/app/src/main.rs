mod demo;
mod terminal;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use exam_core::model::MaterialId;
use services::{ApiConfig, ControllerError, ExamService, InMemoryExamBackend, SessionConfig};

use crate::terminal::ConsoleNotifier;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingMaterial,
    MissingBaseUrl,
    InvalidMaterial { raw: String },
    InvalidMinutes { raw: String },
    InvalidTickMs { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingMaterial => write!(f, "--material is required"),
            ArgsError::MissingBaseUrl => {
                write!(f, "--base-url (or EXAM_API_BASE_URL) is required")
            }
            ArgsError::InvalidMaterial { raw } => write!(f, "invalid --material value: {raw:?}"),
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid --minutes value: {raw}"),
            ArgsError::InvalidTickMs { raw } => write!(f, "invalid EXAM_TICK_MS value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Failure already explained to the student; `main` only sets the exit code.
#[derive(Debug)]
struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("error already reported")
    }
}

impl std::error::Error for Reported {}

/// Show the plain-language message for a failed load; the raw cause only goes to the debug log.
fn report_load_failure(err: &ControllerError) -> Reported {
    log::debug!("loading the test failed: {err}");
    eprintln!("{}", err.user_message());
    Reported
}

fn report_usage_error(err: &ArgsError) -> Reported {
    eprintln!("{err}");
    print_usage();
    Reported
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam take --material <id> [--base-url <url>] [--token <token>]");
    eprintln!("  exam demo [--minutes <n>]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_API_BASE_URL, EXAM_API_TOKEN, EXAM_MATERIAL_ID");
    eprintln!("  EXAM_TICK_MS   countdown tick period in milliseconds (default 1000)");
    eprintln!("  RUST_LOG       log filter, e.g. RUST_LOG=services=debug");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct TakeArgs {
    material_id: MaterialId,
    api: ApiConfig,
}

#[derive(Debug, PartialEq, Eq)]
struct DemoArgs {
    minutes: i64,
}

impl TakeArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let from_env = ApiConfig::from_lookup(env);
        let mut material = env("EXAM_MATERIAL_ID");
        let mut base_url = None;
        let mut token = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--material" => material = Some(require_value(args, "--material")?),
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--token" => token = Some(require_value(args, "--token")?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let raw = material.ok_or(ArgsError::MissingMaterial)?;
        let material_id = raw
            .parse::<MaterialId>()
            .map_err(|_| ArgsError::InvalidMaterial { raw: raw.clone() })?;

        let api = match (base_url, from_env) {
            (Some(url), from_env) if !url.trim().is_empty() => {
                let api = ApiConfig::new(url);
                match from_env.and_then(|config| config.token) {
                    Some(token) => api.with_token(token),
                    None => api,
                }
            }
            (None, Some(from_env)) => from_env,
            _ => return Err(ArgsError::MissingBaseUrl),
        };
        let api = match token {
            Some(token) => api.with_token(token),
            None => api,
        };
        Ok(Self { material_id, api })
    }
}

impl DemoArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut minutes = 3;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--minutes" => {
                    let value = require_value(args, "--minutes")?;
                    minutes = value
                        .parse::<i64>()
                        .ok()
                        .filter(|m| *m > 0)
                        .ok_or(ArgsError::InvalidMinutes { raw: value })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self { minutes })
    }
}

fn session_config(env: &impl Fn(&str) -> Option<String>) -> Result<SessionConfig, ArgsError> {
    let config = SessionConfig::default();
    let Some(raw) = env("EXAM_TICK_MS") else {
        return Ok(config);
    };
    let millis = raw
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or(ArgsError::InvalidTickMs { raw })?;
    Ok(config.with_tick_interval(Duration::from_millis(millis)))
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(first) = argv.first().cloned() else {
        print_usage();
        return Ok(());
    };
    let Some(cmd) = Command::from_arg(&first) else {
        return Err(report_usage_error(&ArgsError::UnknownArg(first)).into());
    };
    argv.remove(0);

    let config = session_config(&env_var).map_err(|e| report_usage_error(&e))?;
    let notifier = Arc::new(ConsoleNotifier);
    let mut iter = argv.into_iter();

    let (service, material_id) = match cmd {
        Command::Take => {
            let parsed =
                TakeArgs::parse(&mut iter, &env_var).map_err(|e| report_usage_error(&e))?;
            log::info!("using backend at {}", parsed.api.base_url);
            (ExamService::http(parsed.api), parsed.material_id)
        }
        Command::Demo => {
            let parsed = DemoArgs::parse(&mut iter).map_err(|e| report_usage_error(&e))?;
            let backend = InMemoryExamBackend::new().with_latency(Duration::from_millis(300));
            let definition = demo::definition(parsed.minutes)?;
            let material_id = definition.material_id().clone();
            backend.insert_test(definition)?;
            let service = ExamService::new(Arc::new(backend.clone()), Arc::new(backend));
            (service, material_id)
        }
    };

    let service = service.with_notifier(notifier).with_config(config);
    let controller = service
        .load(material_id)
        .await
        .map_err(|err| report_load_failure(&err))?;

    terminal::run_attempt(controller).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        if !err.is::<Reported>() {
            eprintln!("{err}");
        }
        std::process::exit(2);
    }
}
