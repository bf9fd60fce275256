// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Converge
//!
//! One reconciliation pass for one application: build the desired instances,
//! observe what the engine runs, start whatever is missing, then hand the
//! complete desired topology to the router.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Diff-and-apply reconciliation

use crate::application::app_locks::AppLocks;
use crate::application::desired_state::DesiredStateBuilder;
use crate::domain::engine::ContainerEngine;
use crate::domain::errors::{OperationError, ReconcileError};
use crate::domain::instance::{ObservedInstance, WorkloadInstance};
use crate::domain::labels::{LabelFilter, LabelSet};
use crate::domain::log_sink::{release_log_stream, LogSink};
use crate::domain::manifest_store::ManifestStore;
use crate::domain::routing::Router;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a successful converge pass
#[derive(Debug, Clone)]
pub struct ConvergeReport {
    pub app: String,
    pub release: String,
    /// The full desired topology, with ids set on instances started this pass
    pub desired: Vec<WorkloadInstance>,
    /// Names of the instances started this pass, in start order
    pub started: Vec<String>,
}

pub struct Reconciler {
    builder: DesiredStateBuilder,
    store: Arc<dyn ManifestStore>,
    engine: Arc<dyn ContainerEngine>,
    router: Arc<dyn Router>,
    log_sink: Arc<dyn LogSink>,
    locks: AppLocks,
}

impl Reconciler {
    pub fn new(
        builder: DesiredStateBuilder,
        store: Arc<dyn ManifestStore>,
        engine: Arc<dyn ContainerEngine>,
        router: Arc<dyn Router>,
        log_sink: Arc<dyn LogSink>,
        locks: AppLocks,
    ) -> Self {
        Self {
            builder,
            store,
            engine,
            router,
            log_sink,
            locks,
        }
    }

    /// Converge `app` toward its active release.
    ///
    /// The first failure aborts the pass. Instances started before the failure
    /// stay running; the next pass finds the rest still missing and retries
    /// them.
    pub async fn converge(&self, app: &str) -> Result<ConvergeReport, OperationError> {
        let _guard = self.locks.lock(app).await;

        let result = self.converge_locked(app).await;
        if let Err(e) = &result {
            metrics::counter!("rack_converge_failures_total").increment(1);
            warn!(app, error = %e, "Converge failed");
        }

        result.map_err(|source| OperationError::converge(app, source))
    }

    async fn converge_locked(&self, app: &str) -> Result<ConvergeReport, ReconcileError> {
        let resolved = self
            .store
            .resolve(app)
            .await
            .map_err(|source| ReconcileError::ManifestResolution {
                app: app.to_string(),
                source,
            })?;
        let release = resolved.release.id.clone();

        let mut desired = self.builder.build(app, &resolved).await?;

        let filter = LabelFilter::rack(&self.builder.identity().rack).with_app(app);
        let current = self.engine.list_by_labels(&filter).await?;

        let needed = needed_indices(&desired, &current);
        debug!(
            app,
            release = %release,
            desired = desired.len(),
            current = current.len(),
            needed = needed.len(),
            "Computed converge diff"
        );

        let stream = release_log_stream(app, &release);
        let mut started = Vec::with_capacity(needed.len());

        for index in needed {
            let instance = &mut desired[index];

            let line = format!("starting: {}\n", instance.name);
            if let Err(e) = self.log_sink.append(&stream, line.as_bytes()).await {
                warn!(app, stream = %stream, error = %e, "Failed to write release log");
            }

            let id = self.engine.start(instance).await?;
            info!(app, release = %release, instance = %instance.name, id = %id, "Started instance");
            metrics::counter!("rack_instances_started_total").increment(1);

            instance.id = Some(id);
            started.push(instance.name.clone());
        }

        self.router.apply(&desired).await?;

        info!(app, release = %release, started = started.len(), "Converged");
        Ok(ConvergeReport {
            app: app.to_string(),
            release,
            desired,
            started,
        })
    }
}

/// Positions in `desired` of the instances no observed instance matches.
///
/// Matching is exact label-set equality; observed instances without a
/// parseable identity match nothing.
pub fn needed_indices(desired: &[WorkloadInstance], current: &[ObservedInstance]) -> Vec<usize> {
    let observed: HashSet<LabelSet> = current
        .iter()
        .filter_map(|c| match c.label_set() {
            Ok(labels) => Some(labels),
            Err(e) => {
                debug!(id = %c.id, error = %e, "Ignoring instance without a reconciler identity");
                None
            }
        })
        .collect();

    desired
        .iter()
        .enumerate()
        .filter(|(_, d)| !observed.contains(&d.labels))
        .map(|(i, _)| i)
        .collect()
}
