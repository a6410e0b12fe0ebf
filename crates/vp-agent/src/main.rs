//! VoicePilot: voice-driven drone control from spoken-language transcripts.
//!
//! Loads configuration (file, environment, flags), builds the interpreter
//! and a simulated vehicle, and either interprets a single utterance or runs
//! a listening session over stdin.

use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vp_agent::config::AgentConfig;
use vp_agent::session::{Session, TurnOutcome};
use vp_agent::transcript::LineTranscripts;
use vp_flight::{Dispatcher, SimulatedVehicle};
use vp_interpreter::Arbiter;

#[derive(Parser, Debug)]
#[command(
    name = "voicepilot",
    version,
    about = "Turn spoken drone commands into safe flight primitives"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Skip the remote interpreter and use keyword matching only
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    fallback_only: bool,

    /// Remote interpreter API key (overrides GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Emit logs as JSON
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interpret one utterance and print the normalized command as JSON
    Interpret {
        /// Transcript text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Read transcripts from stdin, one per line, and fly the simulator
    Listen,
    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    tracing::info!(
        fallback_only = config.interpreter.fallback_only,
        model = %config.interpreter.remote.model,
        "config loaded"
    );

    match cli.command {
        Commands::Interpret { text } => interpret(&config, &text.join(" ")).await,
        Commands::Listen => listen(&config).await,
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    };
    config.apply_env();
    config.apply_overrides(cli.api_key.as_deref(), cli.fallback_only);
    config.validate()?;
    Ok(config)
}

async fn interpret(config: &AgentConfig, text: &str) -> anyhow::Result<()> {
    let arbiter = Arbiter::from_config(&config.interpreter)?;
    let interpretation = arbiter.interpret(text).await;
    tracing::info!(remote = ?interpretation.remote, "interpreted");
    println!("{}", serde_json::to_string_pretty(&interpretation.command)?);
    Ok(())
}

async fn listen(config: &AgentConfig) -> anyhow::Result<()> {
    let arbiter = Arbiter::from_config(&config.interpreter)?;
    let vehicle = Arc::new(SimulatedVehicle::new(config.flight.realtime));
    let dispatcher = Dispatcher::new(
        vehicle.clone(),
        config.interpreter.limits.clone(),
        &config.flight,
    );
    let session = Session::new(&arbiter, &dispatcher, config.session.clone());
    let mut source = LineTranscripts::stdin();

    tracing::info!(
        remote = !arbiter.is_fallback_only(),
        controller = dispatcher.controller().name(),
        "listening"
    );

    tokio::select! {
        summary = session.run_with(&mut source, print_outcome) => {
            let summary = summary?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    println!("{}", serde_json::to_string(&vehicle.state())?);
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    match serde_json::to_string(outcome) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to render outcome"),
    }
}
