#![forbid(unsafe_code)]

mod cli;
mod config;
mod constants;
mod controller;
mod error;
mod placer;
mod profiles;
mod tray;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level as TraceLevel, error, info};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

use cli::{Cli, CliCommand, CommandStatus};
use config::AgentSettings;
use controller::LayoutController;
use placer::DisplayPlacer;
use profiles::ProfileStore;

fn parse_log_level(raw: &str) -> TraceLevel {
    match raw.trim().to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Run `load` under a scoped subscriber at `level`, writing to `writer`.
///
/// Settings decide the final log level, so warnings raised while reading them
/// would otherwise be emitted before any subscriber exists.
fn with_bootstrap_logging<T, W>(level: TraceLevel, writer: W, load: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, load)
}

fn init_logging(settings: &AgentSettings) -> Result<()> {
    // LOG_LEVEL env wins over the settings file
    let raw = std::env::var(constants::env::LOG_LEVEL).unwrap_or_else(|_| settings.log_level.clone());

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&raw))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<CommandStatus> {
    let bootstrap_level = std::env::var(constants::env::LOG_LEVEL)
        .map(|raw| parse_log_level(&raw))
        .unwrap_or(TraceLevel::WARN);
    let mut settings = with_bootstrap_logging(bootstrap_level, std::io::stderr, AgentSettings::load);
    init_logging(&settings)?;

    if let Some(tool) = cli.tool {
        settings.tool_path = Some(tool);
    }
    if let Some(profiles) = cli.profiles {
        settings.profiles_path = Some(profiles);
    }
    info!(settings = ?settings, "Loaded settings");

    let placer = DisplayPlacer::new(settings.tool_path.clone());
    let command = cli.command.unwrap_or(CliCommand::Agent);
    if command == CliCommand::Locate {
        return cli::run_locate(&placer, &mut std::io::stdout());
    }

    let store = match &settings.profiles_path {
        Some(path) => ProfileStore::open(path.clone()),
        None => ProfileStore::open_default(),
    };
    info!(path = %store.path().display(), count = store.profiles().len(), "Opened profile store");

    let mut controller = LayoutController::new(store, placer);
    match command {
        CliCommand::Agent => {
            tray::run_agent(controller, Duration::from_secs(settings.refresh_interval_secs))?;
            Ok(CommandStatus::Ok)
        }
        other => cli::run(&other, &mut controller, &mut std::io::stdout()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(CommandStatus::Ok) => ExitCode::SUCCESS,
        Ok(CommandStatus::Failed) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = ?err, "display-layouts failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
