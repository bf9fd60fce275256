// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Routing adapters
//!
//! [`FileRouteTable`] publishes the desired topology as a JSON document for
//! the rack's proxy to load. The file is replaced as a whole on every apply,
//! so applying the same topology twice leaves it unchanged. Applies are
//! read-modify-write and run one at a time per table.

use crate::domain::instance::{PortTarget, WorkloadInstance};
use crate::domain::routing::{Router, RouterError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub name: String,
    pub app: String,
    pub hostname: String,
    pub targets: Vec<PortTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Instances without targets get no route
    pub fn from_instances(desired: &[WorkloadInstance]) -> Self {
        Self {
            routes: desired
                .iter()
                .filter(|i| !i.targets.is_empty())
                .map(|i| RouteEntry {
                    name: i.name.clone(),
                    app: i.labels.app.clone(),
                    hostname: i.hostname.clone(),
                    targets: i.targets.clone(),
                })
                .collect(),
        }
    }
}

pub struct FileRouteTable {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileRouteTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Read the table currently on disk
    pub async fn load(&self) -> Result<RouteTable, RouterError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| RouterError::Write(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RouteTable::default()),
            Err(e) => Err(RouterError::Write(e.to_string())),
        }
    }
}

#[async_trait]
impl Router for FileRouteTable {
    async fn apply(&self, desired: &[WorkloadInstance]) -> Result<(), RouterError> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;

        // Each apply carries one app's full topology; keep the other apps
        let apps: Vec<&str> = desired.iter().map(|i| i.labels.app.as_str()).collect();
        table.routes.retain(|r| !apps.contains(&r.app.as_str()));
        table.routes.extend(RouteTable::from_instances(desired).routes);
        table.routes.sort_by(|a, b| a.name.cmp(&b.name));

        let json = serde_json::to_vec_pretty(&table).map_err(|e| RouterError::Write(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RouterError::Write(e.to_string()))?;
        }

        // Unique per write so another rackd sharing the file never renames ours
        let tmp = self.path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RouterError::Write(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RouterError::Write(e.to_string()));
        }

        debug!(path = ?self.path, routes = table.routes.len(), "Wrote route table");
        Ok(())
    }
}

/// Records every topology it is given
#[derive(Clone, Default)]
pub struct InMemoryRouter {
    applied: Arc<Mutex<Vec<Vec<WorkloadInstance>>>>,
}

impl InMemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<Vec<WorkloadInstance>> {
        self.applied.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Vec<WorkloadInstance>> {
        self.applied().pop()
    }
}

#[async_trait]
impl Router for InMemoryRouter {
    async fn apply(&self, desired: &[WorkloadInstance]) -> Result<(), RouterError> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(desired.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::{LabelSet, WorkloadKind};

    fn instance(app: &str, name: &str, port: u16) -> WorkloadInstance {
        let hostname = format!("{}.{}", name, app);
        WorkloadInstance {
            id: None,
            name: format!("dev.{}.service.{}.1", app, name),
            hostname: hostname.clone(),
            memory_mb: 256,
            image: format!("dev/{}/{}:B1", app, name),
            command: None,
            env: Default::default(),
            volumes: vec![],
            port,
            targets: if port == 0 {
                vec![]
            } else {
                vec![PortTarget::new("tcp", 80, "tcp", port)]
            },
            labels: LabelSet {
                rack: "dev".to_string(),
                version: "1".to_string(),
                app: app.to_string(),
                release: "R1".to_string(),
                name: name.to_string(),
                hostname,
                kind: WorkloadKind::Service {
                    service: name.to_string(),
                    index: 1,
                    port,
                    scheme: "http".to_string(),
                },
            },
        }
    }

    #[test]
    fn test_instances_without_targets_get_no_route() {
        let table = RouteTable::from_instances(&[instance("shop", "web", 8080), instance("shop", "worker", 0)]);

        assert_eq!(table.routes.len(), 1);
        assert_eq!(table.routes[0].hostname, "web.shop");
        assert_eq!(table.routes[0].targets, vec![PortTarget::new("tcp", 80, "tcp", 8080)]);
    }

    #[tokio::test]
    async fn test_apply_replaces_only_that_apps_routes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let router = FileRouteTable::new(temp_dir.path().join("proxy/routes.json"));

        assert!(router.load().await.unwrap().routes.is_empty());

        router.apply(&[instance("shop", "web", 8080)]).await.unwrap();
        router.apply(&[instance("blog", "web", 3000)]).await.unwrap();
        router.apply(&[instance("shop", "api", 9000)]).await.unwrap();

        let table = router.load().await.unwrap();
        let names: Vec<&str> = table.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["dev.blog.service.web.1", "dev.shop.service.api.1"]);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("routes.json");
        let router = FileRouteTable::new(&path);
        let desired = [instance("shop", "web", 8080)];

        router.apply(&desired).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        router.apply(&desired).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), first);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies_keep_every_app() {
        let temp_dir = tempfile::tempdir().unwrap();
        let router = Arc::new(FileRouteTable::new(temp_dir.path().join("routes.json")));

        for round in 0..10 {
            let tasks: Vec<_> = (0..8)
                .map(|i| {
                    let router = router.clone();
                    tokio::spawn(async move {
                        let desired = [instance(&format!("app{}", i), "web", 3000 + round)];
                        let result = router.apply(&desired).await;
                        result
                    })
                })
                .collect();

            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let table = router.load().await.unwrap();
            assert_eq!(table.routes.len(), 8);
            assert!(table.routes.iter().all(|r| r.targets[0].to_port == 3000 + round));
        }

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_router_records_topologies() {
        let router = InMemoryRouter::new();
        assert!(router.last().is_none());

        router.apply(&[instance("shop", "web", 8080)]).await.unwrap();
        router.apply(&[]).await.unwrap();

        assert_eq!(router.applied().len(), 2);
        assert!(router.last().unwrap().is_empty());
    }
}
