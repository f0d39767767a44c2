//! dialect-sync: reconcile configured code dialects into Postgres.
//!
//! Reads config from flags or env vars (see `dialect-sync --help`):
//!   DIALECT_DATABASE_URL: Postgres connection string (required for `sync`)
//!   DIALECT_CONFIG_PATH:  dialect catalog YAML (default: config/dialects.yaml)
//!   DIALECT_LEADER:       advisory | always | never (default: advisory)

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use dialect_server::commands;
use dialect_server::settings::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dialect_server=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let catalog = commands::load_catalog(&cli.config)?;

    match cli.command {
        Command::Sync(args) => {
            let outcome = commands::sync(catalog, &args).await?;
            print_json(&outcome)?;
            Ok(if outcome.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Languages => {
            for language in commands::languages(&catalog) {
                println!("{language}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Dialects => {
            print_json(&commands::dialects(&catalog))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate(args) => {
            let violations = commands::validate(&catalog, &args)?;
            for v in &violations {
                eprintln!("{v}");
            }
            print_json(&violations)?;
            Ok(if violations.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
