//! Sonda CLI
//!
//! Command-line entry point for the validation harness. All behaviour
//! switches are resolved here, once, into a [`HarnessConfig`]: flags win,
//! then the documented environment fallbacks, then defaults. Nothing below
//! this layer reads the environment.

#![allow(clippy::doc_markdown)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use sonda_api::{ServerCommand, ServiceSession, SessionConfig};
use sonda_harness::{
    declare_cases, load_reference_vectors, render_summary, CaseRunner, EngineVariant,
    HarnessConfig, RunClock,
};

/// Environment fallback for `--capacity-budget`
const ENV_CAPACITY_BUDGET: &str = "SONDA_CAPACITY_BUDGET";
/// Environment fallback for `--soft-timeout`
const ENV_SOFT_TIMEOUT: &str = "SONDA_SOFT_TIMEOUT";
/// Environment fallback for `--hard-timeout`
const ENV_HARD_TIMEOUT: &str = "SONDA_HARD_TIMEOUT";
/// Environment fallback for `--engine`
const ENV_ENGINE: &str = "SONDA_ENGINE";

#[derive(Parser)]
#[command(name = "sonda")]
#[command(about = "End-to-end validation harness for a model-serving service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the declared validation cases against a live endpoint
    Run {
        /// Serving endpoint base URL
        #[arg(long, default_value = "http://127.0.0.1:11434")]
        endpoint: String,

        /// Engine variant selecting the chat-model set (native, all)
        #[arg(long)]
        engine: Option<String>,

        /// Capacity budget in bytes; omit or zero for unconstrained
        #[arg(long)]
        capacity_budget: Option<u64>,

        /// Soft deadline override in seconds (stop dispatching new cases)
        #[arg(long)]
        soft_timeout: Option<u64>,

        /// Hard deadline override in seconds (abort the whole run)
        #[arg(long)]
        hard_timeout: Option<u64>,

        /// Per-call generation budget in seconds
        #[arg(long, default_value = "120")]
        generate_timeout: u64,

        /// Inactivity budget between generation fragments in seconds
        #[arg(long, default_value = "30")]
        idle_timeout: u64,

        /// Reference-vector fixture path
        #[arg(long, default_value = "testdata/embeddings.json")]
        fixture: PathBuf,

        /// Command to start the server when the endpoint is unreachable,
        /// e.g. "ollama serve"
        #[arg(long)]
        server_command: Option<String>,

        /// Seconds to wait for a started server to become ready
        #[arg(long, default_value = "30")]
        ready_timeout: u64,

        /// Write the full case records as JSON to this path
        #[arg(long)]
        json_output: Option<PathBuf>,
    },

    /// List the cases a run would declare, without contacting the service
    Cases {
        /// Engine variant selecting the chat-model set (native, all)
        #[arg(long)]
        engine: Option<String>,

        /// Reference-vector fixture path
        #[arg(long, default_value = "testdata/embeddings.json")]
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            endpoint,
            engine,
            capacity_budget,
            soft_timeout,
            hard_timeout,
            generate_timeout,
            idle_timeout,
            fixture,
            server_command,
            ready_timeout,
            json_output,
        } => {
            let config = HarnessConfig {
                endpoint,
                engine: resolve_engine(engine)?,
                capacity_budget: resolve_u64(capacity_budget, ENV_CAPACITY_BUDGET)?,
                soft_timeout: resolve_u64(soft_timeout, ENV_SOFT_TIMEOUT)?.map(Duration::from_secs),
                hard_timeout: resolve_u64(hard_timeout, ENV_HARD_TIMEOUT)?.map(Duration::from_secs),
                generate_timeout: Duration::from_secs(generate_timeout),
                idle_timeout: Duration::from_secs(idle_timeout),
                fixture_path: fixture,
            };
            let server = server_command.as_deref().map(parse_server_command).transpose()?;
            let exit = run(config, server, Duration::from_secs(ready_timeout), json_output).await?;
            std::process::exit(exit);
        }
        Commands::Cases { engine, fixture } => {
            let references = load_reference_vectors(&fixture)?;
            let cases = declare_cases(resolve_engine(engine)?, &references);
            for case in &cases {
                println!("{:<10} {}", case.kind().to_string(), case.model);
            }
            println!("{} cases", cases.len());
            Ok(())
        }
    }
}

async fn run(
    config: HarnessConfig,
    server: Option<ServerCommand>,
    ready_timeout: Duration,
    json_output: Option<PathBuf>,
) -> anyhow::Result<i32> {
    // Fail fast on misordered deadlines before touching anything else.
    let timeouts = config.timeouts()?;
    let clock = RunClock::start(timeouts);
    info!(
        soft_s = timeouts.soft.as_secs(),
        hard_s = timeouts.hard.as_secs(),
        "setting timeouts"
    );

    let references = load_reference_vectors(&config.fixture_path)?;
    let cases = declare_cases(config.engine, &references);
    info!(cases = cases.len(), "declared case set");

    let session = ServiceSession::establish(SessionConfig {
        endpoint: config.endpoint.clone(),
        server,
        ready_timeout,
    })
    .await
    .context("could not establish a session with the serving endpoint")?;

    let runner = CaseRunner::new(session.client(), clock, &config);
    let report = runner.run(&cases).await;

    session.shutdown().await;

    print!("{}", render_summary(&report));
    if let Some(path) = json_output {
        let json = report.to_json().context("serializing case records")?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing case records to {}", path.display()))?;
        info!(path = %path.display(), "wrote case records");
    }

    Ok(report.exit_code())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Flag value, else documented environment fallback, else none. An
/// unparseable environment value is a configuration error, not a silent
/// default.
fn resolve_u64(flag: Option<u64>, env_name: &str) -> anyhow::Result<Option<u64>> {
    if flag.is_some() {
        return Ok(flag);
    }
    match std::env::var(env_name) {
        Ok(raw) => {
            let parsed = raw
                .parse::<u64>()
                .with_context(|| format!("invalid {env_name}: {raw:?}"))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

fn resolve_engine(flag: Option<String>) -> anyhow::Result<EngineVariant> {
    let raw = match flag {
        Some(raw) => raw,
        None => match std::env::var(ENV_ENGINE) {
            Ok(raw) => raw,
            Err(_) => return Ok(EngineVariant::default()),
        },
    };
    Ok(raw.parse::<EngineVariant>()?)
}

fn parse_server_command(raw: &str) -> anyhow::Result<ServerCommand> {
    let mut parts = raw.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty --server-command"))?;
    Ok(ServerCommand::new(program, parts.map(String::from)))
}
