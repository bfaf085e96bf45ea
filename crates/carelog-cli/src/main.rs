//! CareLog CLI - manage your health records from the terminal
//!
//! Records live in a local `SQLite` store and optionally sync with a CareLog
//! backend across devices.

mod cli;
mod commands;
mod error;
mod session_store;

use clap::Parser;

use cli::{Cli, Commands};
use commands::common::resolve_db_path;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carelog_core=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Visit { command } => commands::visit::run(command, &db_path)?,
        Commands::Document { command } => commands::document::run(command, &db_path)?,
        Commands::Chronic { command } => commands::chronic::run(command, &db_path)?,
        Commands::Member { command } => commands::family::run(command, &db_path)?,
        Commands::Sync { policy } => commands::sync_cmd::run_sync(policy.into(), &db_path).await?,
        Commands::Auth { command } => commands::auth_cmd::run(command).await?,
    }

    Ok(())
}
