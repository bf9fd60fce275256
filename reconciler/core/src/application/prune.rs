// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prune - stop instances of applications that no longer exist
//!
//! The only path that reclaims instances of deleted applications. Stopping is
//! best-effort: a failed stop is recorded as an [`IgnoredStopFailure`] and the
//! sweep moves on. Failing to list applications or instances aborts the sweep.

use crate::application::app_locks::AppLocks;
use crate::domain::engine::ContainerEngine;
use crate::domain::errors::{IgnoredStopFailure, OperationError, ReconcileError};
use crate::domain::instance::{InstanceId, ObservedInstance};
use crate::domain::labels::LabelFilter;
use crate::domain::manifest_store::ManifestStore;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub stopped: Vec<InstanceId>,
    pub ignored: Vec<IgnoredStopFailure>,
}

pub struct Pruner {
    rack: String,
    store: Arc<dyn ManifestStore>,
    engine: Arc<dyn ContainerEngine>,
    locks: AppLocks,
}

impl Pruner {
    pub fn new(
        rack: impl Into<String>,
        store: Arc<dyn ManifestStore>,
        engine: Arc<dyn ContainerEngine>,
        locks: AppLocks,
    ) -> Self {
        Self {
            rack: rack.into(),
            store,
            engine,
            locks,
        }
    }

    pub async fn prune(&self) -> Result<PruneReport, OperationError> {
        self.prune_inner().await.map_err(OperationError::prune)
    }

    async fn prune_inner(&self) -> Result<PruneReport, ReconcileError> {
        let known = self.known_apps().await?;

        let all = self
            .engine
            .list_by_labels(&LabelFilter::rack(&self.rack))
            .await?;

        // Group strays by app so each app's lock is taken once
        let mut strays: BTreeMap<Option<String>, Vec<ObservedInstance>> = BTreeMap::new();
        for instance in all {
            let app = instance.app().map(str::to_string);
            let is_known = app.as_ref().is_some_and(|a| known.contains(a));
            if !is_known {
                strays.entry(app).or_default().push(instance);
            }
        }

        let mut report = PruneReport::default();

        for (app, instances) in strays {
            let guard = match &app {
                Some(name) => {
                    let guard = self.locks.lock(name).await;
                    // The app may have been created while we waited
                    if self.known_apps().await?.contains(name) {
                        debug!(app = %name, "App reappeared, skipping prune");
                        continue;
                    }
                    Some(guard)
                }
                None => None,
            };

            for instance in instances {
                info!(app = ?app, id = %instance.id, "action=kill");

                match self.engine.stop(&instance.id).await {
                    Ok(()) => {
                        metrics::counter!("rack_instances_pruned_total").increment(1);
                        report.stopped.push(instance.id);
                    }
                    Err(error) => {
                        warn!(app = ?app, id = %instance.id, error = %error, "Ignoring failed stop");
                        metrics::counter!("rack_prune_stop_failures_total").increment(1);
                        report.ignored.push(IgnoredStopFailure {
                            id: instance.id,
                            app: app.clone(),
                            error,
                        });
                    }
                }
            }

            // Deleted apps do not keep a lock entry around
            if let Some(name) = &app {
                drop(guard);
                self.locks.forget(name);
            }
        }

        info!(
            stopped = report.stopped.len(),
            ignored = report.ignored.len(),
            "Prune complete"
        );
        Ok(report)
    }

    async fn known_apps(&self) -> Result<HashSet<String>, ReconcileError> {
        let apps = self
            .store
            .list_applications()
            .await
            .map_err(|source| ReconcileError::ManifestResolution {
                app: "*".to_string(),
                source,
            })?;

        Ok(apps.into_iter().map(|a| a.name).collect())
    }
}
