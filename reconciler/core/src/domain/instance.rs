// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::labels::{self, LabelError, LabelSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier the container engine assigns to a started instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One routing rule: traffic arriving on `from_scheme:from_port` is forwarded
/// to the instance on `to_scheme:to_port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortTarget {
    pub from_scheme: String,
    pub from_port: u16,
    pub to_scheme: String,
    pub to_port: u16,
}

impl PortTarget {
    pub fn new(
        from_scheme: impl Into<String>,
        from_port: u16,
        to_scheme: impl Into<String>,
        to_port: u16,
    ) -> Self {
        Self {
            from_scheme: from_scheme.into(),
            from_port,
            to_scheme: to_scheme.into(),
            to_port,
        }
    }

    /// Plain TCP forwarding on the same port
    pub fn passthrough(port: u16) -> Self {
        Self::new("tcp", port, "tcp", port)
    }
}

/// Host path bind-mounted into the instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
}

impl VolumeMount {
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

/// Renders as the engine's `host:container` bind syntax
impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)
    }
}

/// One runnable unit: a backing resource or one service
/// replica.
///
/// Specifications are rebuilt from the manifest on every converge pass; only
/// `id` is filled in once the engine has created the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub id: Option<InstanceId>,
    /// Stable display name, e.g. `dev.shop.service.web.1`
    pub name: String,
    pub hostname: String,
    /// Memory hint in megabytes, 0 for the engine default
    pub memory_mb: u64,
    pub image: String,
    /// Command override; `None` keeps the image entrypoint
    pub command: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub volumes: Vec<VolumeMount>,
    /// Primary listening port, 0 if none
    pub port: u16,
    pub targets: Vec<PortTarget>,
    pub labels: LabelSet,
}

/// An instance as reported by the container engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedInstance {
    pub id: InstanceId,
    pub labels: BTreeMap<String, String>,
}

impl ObservedInstance {
    pub fn new(id: InstanceId, labels: BTreeMap<String, String>) -> Self {
        Self { id, labels }
    }

    /// Strict identity of the instance; instances we did not create (or that
    /// an older scheme created) have none.
    pub fn label_set(&self) -> Result<LabelSet, LabelError> {
        LabelSet::from_map(&self.labels)
    }

    /// Value of the `convox.app` label
    pub fn app(&self) -> Option<&str> {
        self.labels.get(labels::APP).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_mount_display() {
        let mount = VolumeMount::new("/var/convox/shop/resource/db", "/var/lib/mysql");
        assert_eq!(mount.to_string(), "/var/convox/shop/resource/db:/var/lib/mysql");
    }

    #[test]
    fn test_observed_app_label() {
        let observed = ObservedInstance::new(
            InstanceId::new("abc123"),
            BTreeMap::from([(labels::APP.to_string(), "shop".to_string())]),
        );

        assert_eq!(observed.app(), Some("shop"));
        assert!(observed.label_set().is_err());
    }
}
