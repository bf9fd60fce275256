// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Desired-State Builder
//!
//! Turns a manifest into the ordered list of workload instances the
//! application should be running: one per backing resource, then one per
//! replica of every service.

use crate::domain::errors::ReconcileError;
use crate::domain::instance::{PortTarget, VolumeMount, WorkloadInstance};
use crate::domain::labels::{LabelSet, WorkloadKind};
use crate::domain::manifest::{Resource, ResolvedManifest, Service};
use crate::domain::manifest_store::ManifestStore;
use crate::domain::rack_config::RackConfig;
use crate::domain::resource_catalog::ResourceKind;
use std::sync::Arc;
use tracing::debug;

/// Identity stamped on every instance this rack creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RackIdentity {
    pub rack: String,
    pub version: String,
    pub volume_root: String,
}

impl RackIdentity {
    pub fn new(rack: impl Into<String>, version: impl Into<String>, volume_root: impl Into<String>) -> Self {
        Self {
            rack: rack.into(),
            version: version.into(),
            volume_root: volume_root.into(),
        }
    }

    pub fn from_config(config: &RackConfig) -> Self {
        Self::new(&config.rack, &config.version, &config.volume_root)
    }
}

pub struct DesiredStateBuilder {
    identity: RackIdentity,
    store: Arc<dyn ManifestStore>,
}

impl DesiredStateBuilder {
    pub fn new(identity: RackIdentity, store: Arc<dyn ManifestStore>) -> Self {
        Self { identity, store }
    }

    pub fn identity(&self) -> &RackIdentity {
        &self.identity
    }

    /// Resource instances followed by service instances
    pub async fn build(&self, app: &str, resolved: &ResolvedManifest) -> Result<Vec<WorkloadInstance>, ReconcileError> {
        let release = &resolved.release.id;

        let mut desired = self.build_resource_instances(&resolved.manifest.resources, app, release)?;
        desired.extend(
            self.build_service_instances(&resolved.manifest.services, app, release)
                .await?,
        );

        debug!(app, release = %release, count = desired.len(), "Built desired state");
        Ok(desired)
    }

    pub fn build_resource_instances(
        &self,
        resources: &[Resource],
        app: &str,
        release: &str,
    ) -> Result<Vec<WorkloadInstance>, ReconcileError> {
        let mut instances = Vec::with_capacity(resources.len());

        for resource in resources {
            let kind: ResourceKind = resource.resource_type.parse()?;
            let port = kind.port();
            let hostname = format!("{}.resource.{}", resource.name, app);

            instances.push(WorkloadInstance {
                id: None,
                name: format!("{}.{}.resource.{}", self.identity.rack, app, resource.name),
                hostname: hostname.clone(),
                memory_mb: 0,
                image: kind.image(),
                command: None,
                env: Default::default(),
                volumes: kind.volumes(&self.identity.volume_root, app, &resource.name),
                port,
                targets: vec![PortTarget::passthrough(port)],
                labels: LabelSet {
                    rack: self.identity.rack.clone(),
                    version: self.identity.version.clone(),
                    app: app.to_string(),
                    release: release.to_string(),
                    name: resource.name.clone(),
                    hostname,
                    kind: WorkloadKind::Resource {
                        resource: resource.resource_type.clone(),
                    },
                },
            });
        }

        Ok(instances)
    }

    /// Service replicas for `release`.
    ///
    /// Environment and resource URLs come from the manifest of `release`
    /// itself, which is re-resolved because it need not be the app's current
    /// release.
    pub async fn build_service_instances(
        &self,
        services: &[Service],
        app: &str,
        release: &str,
    ) -> Result<Vec<WorkloadInstance>, ReconcileError> {
        let resolved = self
            .store
            .resolve_release(app, release)
            .await
            .map_err(|source| ReconcileError::ManifestResolution {
                app: app.to_string(),
                source,
            })?;
        let manifest = &resolved.manifest;

        let mut instances = Vec::new();

        for service in services {
            let command = match service.command.trim() {
                "" => None,
                cmd => Some(vec!["sh".to_string(), "-c".to_string(), cmd.to_string()]),
            };

            let mut env = manifest
                .service_environment(&service.name)
                .map_err(|source| ReconcileError::EnvironmentResolution {
                    service: service.name.clone(),
                    source,
                })?;

            for dependency in &service.resources {
                if let Some(resource) = manifest.resource(dependency) {
                    let kind: ResourceKind = resource.resource_type.parse()?;
                    env.insert(
                        format!("{}_URL", dependency.to_uppercase()),
                        kind.connection_url(app, &resource.name),
                    );
                }
            }

            let volumes = resolve_service_volumes(&self.identity.volume_root, app, &service.volumes)?;

            let to_scheme = match service.port.scheme.as_str() {
                "https" => "tls",
                _ => "tcp",
            };

            let targets = if service.port.port == 0 {
                vec![]
            } else {
                vec![
                    PortTarget::new("tcp", 80, to_scheme, service.port.port),
                    PortTarget::new("tls", 443, to_scheme, service.port.port),
                ]
            };

            let hostname = format!("{}.{}", service.name, app);
            let image = format!(
                "{}/{}/{}:{}",
                self.identity.rack, app, service.name, resolved.release.build
            );

            for index in 1..=service.scale.count.min {
                instances.push(WorkloadInstance {
                    id: None,
                    name: format!("{}.{}.service.{}.{}", self.identity.rack, app, service.name, index),
                    hostname: hostname.clone(),
                    memory_mb: service.scale.memory,
                    image: image.clone(),
                    command: command.clone(),
                    env: env.clone(),
                    volumes: volumes.clone(),
                    port: service.port.port,
                    targets: targets.clone(),
                    labels: LabelSet {
                        rack: self.identity.rack.clone(),
                        version: self.identity.version.clone(),
                        app: app.to_string(),
                        release: release.to_string(),
                        name: service.name.clone(),
                        hostname: hostname.clone(),
                        kind: WorkloadKind::Service {
                            service: service.name.clone(),
                            index,
                            port: service.port.port,
                            scheme: service.port.scheme.clone(),
                        },
                    },
                });
            }
        }

        Ok(instances)
    }
}

/// Resolve service volume specs into bind mounts.
///
/// `/data` is backed by `<root>/<app>/volumes/data`; `host:container` binds
/// the host path as given.
pub fn resolve_service_volumes(
    volume_root: &str,
    app: &str,
    specs: &[String],
) -> Result<Vec<VolumeMount>, ReconcileError> {
    specs
        .iter()
        .map(|spec| {
            let parts: Vec<&str> = spec.split(':').collect();
            match parts.as_slice() {
                [path] if !path.is_empty() => Ok(VolumeMount::new(
                    format!(
                        "{}/{}/volumes/{}",
                        volume_root.trim_end_matches('/'),
                        app,
                        path.trim_start_matches('/')
                    ),
                    *path,
                )),
                [host, container] if !host.is_empty() && !container.is_empty() => {
                    Ok(VolumeMount::new(*host, *container))
                }
                _ => Err(ReconcileError::InvalidVolume(spec.clone())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_volumes() {
        let volumes = resolve_service_volumes(
            "/var/convox",
            "shop",
            &["/data".to_string(), "/etc/certs:/certs".to_string()],
        )
        .unwrap();

        assert_eq!(volumes[0], VolumeMount::new("/var/convox/shop/volumes/data", "/data"));
        assert_eq!(volumes[1], VolumeMount::new("/etc/certs", "/certs"));
    }

    #[test]
    fn test_invalid_service_volume() {
        for spec in ["a:b:c", "", ":/data"] {
            let err = resolve_service_volumes("/var/convox", "shop", &[spec.to_string()]).unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidVolume(s) if s == spec));
        }
    }
}
