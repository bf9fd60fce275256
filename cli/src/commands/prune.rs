// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::rack::Rack;

/// Stop instances belonging to deleted applications
pub async fn handle_command(config_override: Option<PathBuf>) -> Result<()> {
    let rack = Rack::connect(config_override).await?;

    let report = rack.pruner.prune().await?;

    println!(
        "{} {} instance(s)",
        "Pruned".green().bold(),
        report.stopped.len()
    );
    for id in &report.stopped {
        println!("  - {}", id);
    }

    for ignored in &report.ignored {
        println!(
            "  {} {} ({}): {}",
            "!".yellow(),
            ignored.id,
            ignored.app.as_deref().unwrap_or("no app"),
            ignored.error
        );
    }

    Ok(())
}
