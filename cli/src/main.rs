// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # rackd
//!
//! Keeps the containers of a single-node rack in line with the active
//! release of every application.
//!
//! ## Commands
//!
//! - `rackd converge <app>` - Start whatever the app's release is missing
//! - `rackd prune` - Stop instances of deleted apps
//! - `rackd run` - Converge all apps and prune on an interval until Ctrl-C
//! - `rackd config show|validate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use rack_reconciler::commands::{self, ConfigCommand};

/// Single-node rack reconciler
#[derive(Parser)]
#[command(name = "rackd")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "RACK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RACK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge one application toward its active release
    #[command(name = "converge")]
    Converge {
        /// Application name
        app: String,
    },

    /// Stop instances of applications that no longer exist
    #[command(name = "prune")]
    Prune,

    /// Run the reconcile loop in the foreground
    #[command(name = "run")]
    Run,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Converge { app }) => commands::converge::handle_command(app, cli.config).await,
        Some(Commands::Prune) => commands::prune::handle_command(cli.config).await,
        Some(Commands::Run) => commands::run::handle_command(cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
