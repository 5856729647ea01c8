//! quickcal CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use quickcal_core::{TracingConfig, init_tracing};

use quickcal_cli::cli::{Cli, Command, ConfigAction};
use quickcal_cli::commands;
use quickcal_cli::config::ClientConfig;
use quickcal_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    if let Err(e) = init_tracing(TracingConfig::cli(debug)) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli.command, &config, &config_path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &ClientConfig, config_path: &std::path::Path) -> CliResult<()> {
    match command {
        Command::Add(args) => commands::add::add(&args, config).await,
        Command::Auth {
            credentials_file,
            force,
        } => commands::auth::auth(credentials_file, force, config, config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(config, config_path),
            ConfigAction::Validate => commands::config::validate(config),
            ConfigAction::Path => commands::config::path(config_path),
        },
    }
}
