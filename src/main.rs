use clap::{CommandFactory, Parser};
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io;
use std::path::PathBuf;

use beacon::Kind;
use beacon::config::{Config, LogLevel};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn setup_logging(log_level: LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beacon")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("beacon.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.to_level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Event(args) => commands::emit::run(Kind::Event, args, &config),
        Commands::Error(args) => commands::emit::run(Kind::Error, args, &config),
        Commands::Catalog { action } => commands::catalog::run(action, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "beacon", &mut io::stdout());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level).context("Failed to setup logging")?;

    info!("Starting beacon with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
