// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rack_reconciler_core::application::{AppLocks, DesiredStateBuilder, Pruner, RackIdentity, Reconciler};
use rack_reconciler_core::domain::engine::{ContainerEngine, EngineError};
use rack_reconciler_core::domain::instance::{InstanceId, ObservedInstance, WorkloadInstance};
use rack_reconciler_core::domain::labels::{self, LabelFilter};
use rack_reconciler_core::domain::manifest::{
    Manifest, Release, Resource, ScaleCount, Service, ServicePort, ServiceScale,
};
use rack_reconciler_core::infrastructure::{InMemoryLogSink, InMemoryManifestStore, InMemoryRouter};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

pub const RACK: &str = "dev";
pub const VERSION: &str = "20260101000000";

#[derive(Default)]
struct FakeState {
    running: Vec<ObservedInstance>,
    started: Vec<WorkloadInstance>,
    stopped: Vec<InstanceId>,
    start_calls: usize,
    next_id: usize,
    fail_start_call: Option<usize>,
    fail_stop: HashSet<String>,
    fail_list: bool,
}

/// Container engine double that keeps running instances in memory
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th start call (1-based, counted over the engine's lifetime) fail
    pub fn fail_start_call(&self, n: usize) {
        self.state.lock().unwrap().fail_start_call = Some(n);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_start_call = None;
        state.fail_stop.clear();
        state.fail_list = false;
    }

    pub fn fail_stop(&self, id: &str) {
        self.state.lock().unwrap().fail_stop.insert(id.to_string());
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    /// Pretend an instance is already running with the given labels
    pub fn seed(&self, id: &str, labels: BTreeMap<String, String>) {
        self.state
            .lock()
            .unwrap()
            .running
            .push(ObservedInstance::new(InstanceId::new(id), labels));
    }

    pub fn started(&self) -> Vec<WorkloadInstance> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<InstanceId> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn running(&self) -> Vec<ObservedInstance> {
        self.state.lock().unwrap().running.clone()
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.started.clear();
        state.stopped.clear();
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn start(&self, instance: &WorkloadInstance) -> Result<InstanceId, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.start_calls += 1;

        if state.fail_start_call == Some(state.start_calls) {
            return Err(EngineError::Start {
                name: instance.name.clone(),
                reason: "image not found".to_string(),
            });
        }

        state.next_id += 1;
        let id = InstanceId::new(format!("c{}", state.next_id));
        state
            .running
            .push(ObservedInstance::new(id.clone(), instance.labels.to_map()));
        state.started.push(instance.clone());
        Ok(id)
    }

    async fn list_by_labels(&self, filter: &LabelFilter) -> Result<Vec<ObservedInstance>, EngineError> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(EngineError::List("daemon unavailable".to_string()));
        }
        Ok(state
            .running
            .iter()
            .filter(|i| filter.matches(&i.labels))
            .cloned()
            .collect())
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stop.contains(id.as_str()) {
            return Err(EngineError::Stop {
                id: id.clone(),
                reason: "no such container".to_string(),
            });
        }
        state.running.retain(|i| &i.id != id);
        state.stopped.push(id.clone());
        Ok(())
    }
}

pub fn release(app: &str, id: &str, build: &str) -> Release {
    Release {
        id: id.to_string(),
        app: app.to_string(),
        build: build.to_string(),
        env: BTreeMap::new(),
        created: Utc::now(),
    }
}

pub fn service(name: &str, port: u16, scheme: &str, min: u32) -> Service {
    Service {
        name: name.to_string(),
        command: String::new(),
        environment: vec![],
        port: ServicePort {
            port,
            scheme: scheme.to_string(),
        },
        resources: vec![],
        volumes: vec![],
        scale: ServiceScale {
            count: ScaleCount { min, max: min },
            memory: 512,
        },
    }
}

/// One redis resource `cache`, one service `web` on 8080/http with two
/// replicas depending on `cache`
pub fn scenario_manifest() -> Manifest {
    let mut web = service("web", 8080, "http", 2);
    web.resources = vec!["cache".to_string()];
    web.environment = vec!["MODE=development".to_string()];

    Manifest {
        resources: vec![Resource {
            name: "cache".to_string(),
            resource_type: "redis".to_string(),
        }],
        services: vec![web],
        env: BTreeMap::new(),
    }
}

pub fn app_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::RACK.to_string(), RACK.to_string()),
        (labels::APP.to_string(), app.to_string()),
    ])
}

pub struct Harness {
    pub store: InMemoryManifestStore,
    pub engine: Arc<FakeEngine>,
    pub router: InMemoryRouter,
    pub logs: InMemoryLogSink,
    pub locks: AppLocks,
    pub reconciler: Arc<Reconciler>,
    pub pruner: Arc<Pruner>,
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryManifestStore::new();
        let engine = Arc::new(FakeEngine::new());
        let router = InMemoryRouter::new();
        let logs = InMemoryLogSink::new();
        let locks = AppLocks::new();

        let builder = DesiredStateBuilder::new(
            RackIdentity::new(RACK, VERSION, "/var/convox"),
            Arc::new(store.clone()),
        );

        let reconciler = Arc::new(Reconciler::new(
            builder,
            Arc::new(store.clone()),
            engine.clone(),
            Arc::new(router.clone()),
            Arc::new(logs.clone()),
            locks.clone(),
        ));

        let pruner = Arc::new(Pruner::new(
            RACK,
            Arc::new(store.clone()),
            engine.clone(),
            locks.clone(),
        ));

        Self {
            store,
            engine,
            router,
            logs,
            locks,
            reconciler,
            pruner,
        }
    }

    pub fn with_scenario() -> Self {
        let harness = Self::new();
        harness
            .store
            .promote(scenario_manifest(), release("shop", "R1", "B1"));
        harness
    }
}
