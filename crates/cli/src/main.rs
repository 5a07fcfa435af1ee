mod commands;
mod render;

use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dealership_core::{
    config::{self, AppConfig},
    DealershipManager, LoadOutcome,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

use crate::commands::Command;

/// Dealership inventory manager.
#[derive(Parser, Debug)]
#[command(name = "dealerctl", about = "Manage a dealership network's vehicle inventory")]
struct Cli {
    /// Config file (default: <config dir>/dealership/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Inventory document, overriding the configured path.
    #[arg(long = "inventory", global = true)]
    inventory: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    #[command(flatten)]
    Once(Command),

    /// Read commands from stdin, one per line, against a single session.
    Shell,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    if let Some(path) = cli.inventory {
        config.inventory_path = path;
    }

    init_logging(&config)?;

    let (mut manager, outcome) = DealershipManager::from_config(&config);
    if let LoadOutcome::Unreadable(err) = &outcome {
        eprintln!("Warning: inventory could not be read, starting empty: {err:#}");
    }

    match cli.command {
        Mode::Shell => {
            let stdin = io::stdin();
            commands::run_shell(&mut manager, &config, stdin.lock(), io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Once(command) => match commands::execute(&mut manager, &config, command) {
            Ok(text) => {
                println!("{text}");
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                info!("command failed: {err}");
                eprintln!("{}", commands::report(&err));
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create {}", config.log_dir.display()))?;
    let log_path = config.log_dir.join("dealerctl.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .with_filter(LevelFilter::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file))
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
