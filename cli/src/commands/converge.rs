// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::rack::Rack;

/// Converge one application and print what was started
pub async fn handle_command(app: String, config_override: Option<PathBuf>) -> Result<()> {
    let rack = Rack::connect(config_override).await?;

    let report = rack.reconciler.converge(&app).await?;

    println!(
        "{} {} @ {}",
        "Converged".green().bold(),
        report.app.bold(),
        report.release
    );
    println!("  Desired instances: {}", report.desired.len());

    if report.started.is_empty() {
        println!("  {}", "Nothing to start".dimmed());
    } else {
        println!("  Started:");
        for name in &report.started {
            println!("    - {}", name);
        }
    }

    Ok(())
}
