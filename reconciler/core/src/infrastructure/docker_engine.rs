// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::engine::{ContainerEngine, EngineError};
use crate::domain::instance::{InstanceId, ObservedInstance, WorkloadInstance};
use crate::domain::labels::LabelFilter;
use async_trait::async_trait;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, ListContainersOptions, ListContainersOptionsBuilder,
    RemoveContainerOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
};
use bollard::Docker;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Seconds a container gets to exit before it is killed on stop
const STOP_GRACE_SECONDS: i32 = 10;

pub struct DockerEngine {
    docker: Docker,
    network: Option<String>,
}

impl DockerEngine {
    pub fn new(socket_path: Option<String>, network: Option<String>) -> Result<Self, EngineError> {
        // Connect to Docker daemon (custom socket or auto-detect)
        let docker = if let Some(path) = socket_path {
            #[cfg(unix)]
            let result = Docker::connect_with_unix(&path, 120, bollard::API_DEFAULT_VERSION);

            #[cfg(windows)]
            let result = Docker::connect_with_named_pipe(&path, 120, bollard::API_DEFAULT_VERSION);

            result.map_err(|e| EngineError::Connection(format!(
                "Failed to connect to Docker at {}: {}\n\n\
                 Ensure Docker is running and the socket path is correct.",
                path, e
            )))?
        } else {
            Docker::connect_with_local_defaults()
                .map_err(|e| EngineError::Connection(format!(
                    "Failed to connect to Docker: {}\n\n\
                     Check that the daemon is running (docker ps) and that the\n\
                     current user can access /var/run/docker.sock.",
                    e
                )))?
        };

        Ok(Self { docker, network })
    }

    /// Verify Docker daemon is accessible
    pub async fn healthcheck(&self) -> Result<(), EngineError> {
        self.docker
            .ping()
            .await
            .map_err(|e| EngineError::Connection(format!("Cannot connect to Docker daemon: {}", e)))?;
        Ok(())
    }
}

/// Create body for `instance`: env as `K=V`, memory in bytes, binds as
/// `host:container`
pub(crate) fn container_body(instance: &WorkloadInstance, network: Option<&str>) -> ContainerCreateBody {
    let env: Vec<String> = instance
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let labels: HashMap<String, String> = instance.labels.to_map().into_iter().collect();

    let binds: Vec<String> = instance.volumes.iter().map(|v| v.to_string()).collect();

    let mut host_config = HostConfig {
        binds: if binds.is_empty() { None } else { Some(binds) },
        network_mode: network.map(str::to_string),
        ..Default::default()
    };

    if instance.memory_mb > 0 {
        host_config.memory = Some((instance.memory_mb * 1024 * 1024) as i64);
    }

    ContainerCreateBody {
        hostname: Some(instance.hostname.clone()),
        image: Some(instance.image.clone()),
        cmd: instance.command.clone(),
        env: Some(env),
        labels: Some(labels),
        host_config: Some(host_config),
        ..Default::default()
    }
}

/// Running containers carrying every label of `filter`
pub(crate) fn list_options(filter: &LabelFilter) -> ListContainersOptions {
    let label_filters: Vec<String> = filter.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

    ListContainersOptionsBuilder::default()
        .all(false)
        .filters(&HashMap::from([("label", label_filters)]))
        .build()
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn start(&self, instance: &WorkloadInstance) -> Result<InstanceId, EngineError> {
        // Names are stable per slot, so a previous release's container holds it
        let remove = RemoveContainerOptionsBuilder::default().force(true).build();
        if let Err(e) = self.docker.remove_container(&instance.name, Some(remove)).await {
            debug!(name = %instance.name, error = %e, "No previous container removed");
        }

        let options = CreateContainerOptionsBuilder::default()
            .name(&instance.name)
            .build();

        let res = self
            .docker
            .create_container(Some(options), container_body(instance, self.network.as_deref()))
            .await
            .map_err(|e| EngineError::Start {
                name: instance.name.clone(),
                reason: e.to_string(),
            })?;

        self.docker
            .start_container(&res.id, None::<StartContainerOptions>)
            .await
            .map_err(|e| EngineError::Start {
                name: instance.name.clone(),
                reason: format!("Failed to start container: {}", e),
            })?;

        info!(name = %instance.name, id = %res.id, "Started container");
        Ok(InstanceId::new(res.id))
    }

    async fn list_by_labels(&self, filter: &LabelFilter) -> Result<Vec<ObservedInstance>, EngineError> {
        let containers = self
            .docker
            .list_containers(Some(list_options(filter)))
            .await
            .map_err(|e| EngineError::List(e.to_string()))?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let id = c.id?;
                let labels: BTreeMap<String, String> = c.labels.unwrap_or_default().into_iter().collect();
                Some(ObservedInstance::new(InstanceId::new(id), labels))
            })
            .collect())
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), EngineError> {
        let options = StopContainerOptionsBuilder::default()
            .t(STOP_GRACE_SECONDS)
            .build();

        self.docker
            .stop_container(id.as_str(), Some(options))
            .await
            .map_err(|e| EngineError::Stop {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        info!(id = %id, "Stopped container");
        Ok(())
    }
}
