use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error};
use reco_adapters::{SimulatedProvider, SimulatedState, SimulatedStorage};
use reco_core::{FlowEngine, PipelineContext};
use recoflow::{AppConfig, AppError, FlowRunner};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Uso: reco-cli <provision|teardown|step|teardown-step> <context.json> [--state <file>] [--settle <N>]";

const EXIT_USAGE: i32 = 2;
const EXIT_FLOW: i32 = 3;
const EXIT_IO: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Provision,
    Teardown,
    Step,
    TeardownStep,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    command: Command,
    context: PathBuf,
    state: Option<PathBuf>,
    settle: u32,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let command = match args.first()?.as_str() {
        "provision" => Command::Provision,
        "teardown" => Command::Teardown,
        "step" => Command::Step,
        "teardown-step" => Command::TeardownStep,
        _ => return None,
    };
    let mut context: Option<PathBuf> = None;
    let mut state: Option<PathBuf> = None;
    let mut settle = 0;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--state" => {
                i += 1;
                state = Some(PathBuf::from(args.get(i)?));
            }
            "--settle" => {
                i += 1;
                settle = args.get(i)?.parse().ok()?;
            }
            other if other.starts_with("--") => return None,
            other => {
                if context.is_some() {
                    return None;
                }
                context = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }
    Some(Args { command,
                context: context?,
                state,
                settle })
}

/// Instala el subscriber global. Devuelve `false` si ya había uno.
fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env("RECOFLOW_LOG").or_else(|_| EnvFilter::try_from_default_env())
                                                       .unwrap_or_else(|_| EnvFilter::new("info"));
    match tracing_subscriber::fmt().with_env_filter(filter)
                                   .with_writer(std::io::stderr)
                                   .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            debug!("cli:logging_already_initialised error={e}");
            false
        }
    }
}

fn load_provider(state: Option<&Path>, settle: u32) -> Result<SimulatedProvider, AppError> {
    match state {
        Some(path) if path.exists() => {
            let raw = std::fs::read_to_string(path)?;
            let state: SimulatedState = serde_json::from_str(&raw)?;
            debug!("cli:state_loaded path={} resources={}", path.display(), state.resources.len());
            Ok(SimulatedProvider::from_state(state))
        }
        _ => Ok(SimulatedProvider::new().with_settle_after(settle)),
    }
}

async fn run(args: &Args, config: &AppConfig, provider: Arc<SimulatedProvider>) -> Result<PipelineContext, AppError> {
    let raw = std::fs::read_to_string(&args.context)?;
    let ctx: PipelineContext = serde_json::from_str(&raw)?;
    let storage = Arc::new(SimulatedStorage::new());

    let out = match args.command {
        Command::Provision => FlowRunner::new(config, provider, storage).provision(ctx).await?,
        Command::Teardown => FlowRunner::new(config, provider, storage).teardown(ctx).await?,
        Command::Step => FlowEngine::builder(provider).storage(storage)
                                                      .settings(config.engine_settings())
                                                      .build()
                                                      .step(ctx)?,
        Command::TeardownStep => FlowEngine::builder(provider).settings(config.engine_settings())
                                                              .build_teardown()
                                                              .teardown_step(ctx)?,
    };
    Ok(out)
}

fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::Flow(_) | AppError::Timeout { .. } => EXIT_FLOW,
        AppError::Config(_) => EXIT_USAGE,
        AppError::Io(_) | AppError::Serialization(_) => EXIT_IO,
    }
}

fn save_state(path: &Path, provider: &SimulatedProvider) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(&provider.snapshot())?;
    std::fs::write(path, json)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    recoflow::init_dotenv();
    init_logging();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&argv) else {
        eprintln!("{USAGE}");
        std::process::exit(EXIT_USAGE);
    };
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[reco-cli] {e}");
            std::process::exit(EXIT_USAGE);
        }
    };
    let provider = match load_provider(args.state.as_deref(), args.settle) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("[reco-cli] estado ilegible: {e}");
            std::process::exit(exit_code(&e));
        }
    };

    let result = run(&args, &config, Arc::clone(&provider)).await;

    // El estado se persiste también tras un fallo: los recursos creados siguen existiendo.
    if let Some(path) = &args.state {
        if let Err(e) = save_state(path, &provider) {
            eprintln!("[reco-cli] no se pudo guardar el estado: {e}");
            std::process::exit(exit_code(&e));
        }
    }

    match result {
        Ok(ctx) => match serde_json::to_string_pretty(&ctx) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("[reco-cli] {e}");
                std::process::exit(EXIT_IO);
            }
        },
        Err(e) => {
            error!("cli:failed error={e}");
            eprintln!("[reco-cli] {e}");
            if let Some(ctx) = e.context() {
                if let Ok(json) = serde_json::to_string_pretty(ctx) {
                    println!("{json}");
                }
            }
            std::process::exit(exit_code(&e));
        }
    }
}
