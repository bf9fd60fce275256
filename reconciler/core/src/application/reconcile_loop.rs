// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reconcile Loop - Background task driving converge and prune
//!
//! Every tick converges each application the manifest store knows about,
//! then sweeps instances of deleted applications.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic reconciliation of the whole rack

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::converge::Reconciler;
use crate::application::prune::Pruner;
use crate::domain::manifest_store::ManifestStore;
use crate::domain::rack_config::ReconcileConfig;

/// Summary of one loop iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub converged: usize,
    pub failed: usize,
    pub started: usize,
    pub pruned: usize,
}

pub struct ReconcileLoop {
    reconciler: Arc<Reconciler>,
    pruner: Arc<Pruner>,
    store: Arc<dyn ManifestStore>,
    config: ReconcileConfig,
    shutdown_token: CancellationToken,
}

impl ReconcileLoop {
    pub fn new(
        reconciler: Arc<Reconciler>,
        pruner: Arc<Pruner>,
        store: Arc<dyn ManifestStore>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            reconciler,
            pruner,
            store,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the loop as a background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run until the shutdown token fires
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Reconcile loop is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting reconcile loop"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let summary = self.cycle().await;
                    debug!(?summary, "Reconcile cycle finished");
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping reconcile loop");
                    break;
                }
            }
        }

        info!("Reconcile loop stopped");
    }

    /// One converge-all-then-prune pass. Failures are logged, never fatal.
    pub async fn cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        match self.store.list_applications().await {
            Ok(apps) => {
                for app in apps {
                    if app.release.is_none() {
                        debug!(app = %app.name, "Skipping app without a release");
                        continue;
                    }

                    match self.reconciler.converge(&app.name).await {
                        Ok(report) => {
                            summary.converged += 1;
                            summary.started += report.started.len();
                        }
                        Err(e) => {
                            summary.failed += 1;
                            warn!(app = %app.name, "{}", e);
                        }
                    }
                }
            }
            Err(e) => warn!("Failed to list applications: {}", e),
        }

        match self.pruner.prune().await {
            Ok(report) => summary.pruned = report.stopped.len(),
            Err(e) => warn!("{}", e),
        }

        summary
    }
}
