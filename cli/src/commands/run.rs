// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Foreground daemon: run the reconcile loop until Ctrl-C

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::rack::Rack;

pub async fn handle_command(config_override: Option<PathBuf>) -> Result<()> {
    let rack = Rack::connect(config_override).await?;

    info!(
        rack = %rack.config.rack,
        manifest_dir = ?rack.config.manifest_dir,
        "Starting rack reconciler"
    );

    let reconcile_loop = rack.reconcile_loop();
    let shutdown = reconcile_loop.shutdown_token();
    let mut handle = reconcile_loop.start();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Received Ctrl-C, shutting down");
            shutdown.cancel();
            handle.await.context("Reconcile loop task panicked")?;
        }
        result = &mut handle => {
            // A disabled loop returns straight away
            result.context("Reconcile loop task panicked")?;
        }
    }

    Ok(())
}
