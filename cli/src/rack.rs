// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring
//!
//! Builds the reconciler, pruner and loop against the Docker engine and the
//! file-backed manifest store, route table and release logs named in the
//! rack configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use rack_reconciler_core::{
    application::{AppLocks, DesiredStateBuilder, Pruner, RackIdentity, ReconcileLoop, Reconciler},
    domain::{engine::ContainerEngine, manifest_store::ManifestStore, rack_config::RackConfig},
    infrastructure::{DockerEngine, FileLogSink, FileRouteTable, YamlManifestStore},
};

pub struct Rack {
    pub config: RackConfig,
    pub store: Arc<dyn ManifestStore>,
    pub reconciler: Arc<Reconciler>,
    pub pruner: Arc<Pruner>,
}

impl Rack {
    /// Load configuration and connect to the container engine
    pub async fn connect(config_path: Option<PathBuf>) -> Result<Self> {
        let config = RackConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;

        let engine = DockerEngine::new(
            config.engine.docker_socket_path.clone(),
            config.engine.network.clone(),
        )
        .context("Failed to connect to Docker")?;
        engine.healthcheck().await.context("Docker is not reachable")?;

        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    pub fn with_engine(config: RackConfig, engine: Arc<dyn ContainerEngine>) -> Self {
        let store: Arc<dyn ManifestStore> = Arc::new(YamlManifestStore::new(&config.manifest_dir));
        let locks = AppLocks::new();

        let builder = DesiredStateBuilder::new(RackIdentity::from_config(&config), store.clone());
        let reconciler = Arc::new(Reconciler::new(
            builder,
            store.clone(),
            engine.clone(),
            Arc::new(FileRouteTable::new(&config.route_table_path)),
            Arc::new(FileLogSink::new(&config.log_dir)),
            locks.clone(),
        ));
        let pruner = Arc::new(Pruner::new(&config.rack, store.clone(), engine, locks));

        Self {
            config,
            store,
            reconciler,
            pruner,
        }
    }

    pub fn reconcile_loop(&self) -> Arc<ReconcileLoop> {
        Arc::new(ReconcileLoop::new(
            self.reconciler.clone(),
            self.pruner.clone(),
            self.store.clone(),
            self.config.reconcile.clone(),
        ))
    }
}
