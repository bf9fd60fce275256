// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use rack_reconciler_core::domain::rack_config::RackConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = RackConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. RACK_CONFIG_PATH: {}",
            std::env::var("RACK_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./rack-config.yaml");
        println!("  4. ~/.convox/rack-config.yaml");
        println!("  5. /etc/convox/rack-config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Rack Identity:".bold());
    println!("  Rack: {}", config.rack);
    println!("  Version: {}", config.version);
    println!();

    println!("{}", "Storage:".bold());
    println!("  Volume root: {}", config.volume_root);
    println!("  Manifests: {}", config.manifest_dir.display());
    println!("  Release logs: {}", config.log_dir.display());
    println!("  Route table: {}", config.route_table_path.display());
    println!();

    println!("{}", "Engine:".bold());
    println!(
        "  Docker socket: {}",
        config.engine.docker_socket_path.as_deref().unwrap_or("(auto)")
    );
    println!(
        "  Network: {}",
        config.engine.network.as_deref().unwrap_or("(default bridge)")
    );
    println!();

    println!("{}", "Reconcile Loop:".bold());
    println!("  Enabled: {}", config.reconcile.enabled);
    println!("  Interval: {}s", config.reconcile.interval_seconds);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = RackConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}
