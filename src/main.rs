use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use surat::cli::Cli;
use surat::cmd::*;
use surat::config::Config;
use surat::store::JsonStore;
use surat::workflow::Workflow;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir.clone());

    // RUST_LOG wins, then -v, then the config file.
    let level = cli
        .log_level()
        .map(str::to_string)
        .or_else(|| config.as_ref().ok().and_then(|c| c.log_level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = config
        .context("failed to load configuration")
        .and_then(|config| run(cli.command, &config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn open_workflow(config: &Config) -> anyhow::Result<Workflow<JsonStore>> {
    let store = JsonStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?;
    Ok(Workflow::open(store, config.seed_defaults)?)
}

fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        // No data directory needed
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
        Commands::Options => {
            cmd_options();
            Ok(())
        }

        Commands::Login { name, password } => cmd_login(&mut open_workflow(config)?, &name, &password),
        Commands::Logout => cmd_logout(&mut open_workflow(config)?),
        Commands::Whoami => cmd_whoami(&open_workflow(config)?),
        Commands::User { action } => cmd_user(&mut open_workflow(config)?, action),
        Commands::Report { action } => cmd_report(&mut open_workflow(config)?, action),
        Commands::Task { action } => cmd_task(&mut open_workflow(config)?, action),
        Commands::Track { query, all } => cmd_track(&open_workflow(config)?, &query, all),
        Commands::Backup => cmd_backup(open_workflow(config)?.store()),
    }
}
