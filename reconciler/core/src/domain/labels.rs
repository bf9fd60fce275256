// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Workload Identity Labels
//!
//! Every workload instance the reconciler creates carries a set of `convox.*`
//! labels. The label set is the only identity used to match desired instances
//! against observed ones: two instances are the same instance if and only if
//! their label sets are equal. Any changed field (release, replica index,
//! port, ...) is a new identity, never an in-place update.
//!
//! The keys below are part of the wire contract with the container engine and
//! the routing layer and must not change.
//!
//! | Key | Resource | Service |
//! |-----|----------|---------|
//! | `convox.rack`, `convox.version`, `convox.app`, `convox.release` | yes | yes |
//! | `convox.type`, `convox.name`, `convox.hostname` | yes | yes |
//! | `convox.resource` | yes | |
//! | `convox.service`, `convox.index`, `convox.port`, `convox.scheme` | | yes |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const LABEL_PREFIX: &str = "convox.";

pub const RACK: &str = "convox.rack";
pub const VERSION: &str = "convox.version";
pub const APP: &str = "convox.app";
pub const RELEASE: &str = "convox.release";
pub const TYPE: &str = "convox.type";
pub const NAME: &str = "convox.name";
pub const HOSTNAME: &str = "convox.hostname";
pub const RESOURCE: &str = "convox.resource";
pub const SERVICE: &str = "convox.service";
pub const INDEX: &str = "convox.index";
pub const PORT: &str = "convox.port";
pub const SCHEME: &str = "convox.scheme";

pub const TYPE_RESOURCE: &str = "resource";
pub const TYPE_SERVICE: &str = "service";

/// Kind-specific part of a workload identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkloadKind {
    /// Backing resource process (database, cache)
    Resource {
        /// Resource type, e.g. "postgres"
        resource: String,
    },
    /// One replica of an application service
    Service {
        service: String,
        /// 1-based replica index
        index: u32,
        /// Declared service port, 0 when the service listens on nothing
        port: u16,
        /// Declared port scheme, possibly empty
        scheme: String,
    },
}

impl WorkloadKind {
    pub fn type_label(&self) -> &'static str {
        match self {
            WorkloadKind::Resource { .. } => TYPE_RESOURCE,
            WorkloadKind::Service { .. } => TYPE_SERVICE,
        }
    }
}

/// Exact-match identity fingerprint of a workload instance.
///
/// Equality is structural over every field, which is the same as equality of
/// the rendered `convox.*` label maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSet {
    pub rack: String,
    pub version: String,
    pub app: String,
    pub release: String,
    pub name: String,
    pub hostname: String,
    pub kind: WorkloadKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("missing label: {0}")]
    Missing(&'static str),

    #[error("unknown workload type: {0}")]
    UnknownType(String),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("unexpected label: {0}")]
    Unexpected(String),
}

impl LabelSet {
    /// Render the label set as the map applied to the container
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (RACK.to_string(), self.rack.clone()),
            (VERSION.to_string(), self.version.clone()),
            (APP.to_string(), self.app.clone()),
            (RELEASE.to_string(), self.release.clone()),
            (TYPE.to_string(), self.kind.type_label().to_string()),
            (NAME.to_string(), self.name.clone()),
            (HOSTNAME.to_string(), self.hostname.clone()),
        ]);

        match &self.kind {
            WorkloadKind::Resource { resource } => {
                labels.insert(RESOURCE.to_string(), resource.clone());
            }
            WorkloadKind::Service { service, index, port, scheme } => {
                labels.insert(SERVICE.to_string(), service.clone());
                labels.insert(INDEX.to_string(), index.to_string());
                labels.insert(PORT.to_string(), port.to_string());
                labels.insert(SCHEME.to_string(), scheme.clone());
            }
        }

        labels
    }

    /// Parse an observed label map.
    ///
    /// Keys outside the `convox.` namespace are ignored (images may carry
    /// their own labels). Within the namespace the key set must be exactly the
    /// one [`LabelSet::to_map`] produces for the workload type.
    pub fn from_map(labels: &BTreeMap<String, String>) -> Result<Self, LabelError> {
        let mut owned: BTreeMap<&str, &str> = labels
            .iter()
            .filter(|(k, _)| k.starts_with(LABEL_PREFIX))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut take = |key: &'static str| -> Result<String, LabelError> {
            owned
                .remove(key)
                .map(str::to_string)
                .ok_or(LabelError::Missing(key))
        };

        let rack = take(RACK)?;
        let version = take(VERSION)?;
        let app = take(APP)?;
        let release = take(RELEASE)?;
        let kind_label = take(TYPE)?;
        let name = take(NAME)?;
        let hostname = take(HOSTNAME)?;

        let kind = match kind_label.as_str() {
            TYPE_RESOURCE => WorkloadKind::Resource {
                resource: take(RESOURCE)?,
            },
            TYPE_SERVICE => {
                let service = take(SERVICE)?;
                let index = take(INDEX)?;
                let port = take(PORT)?;
                let scheme = take(SCHEME)?;
                WorkloadKind::Service {
                    service,
                    index: index
                        .parse()
                        .map_err(|_| LabelError::Invalid { key: INDEX, value: index.clone() })?,
                    port: port
                        .parse()
                        .map_err(|_| LabelError::Invalid { key: PORT, value: port.clone() })?,
                    scheme,
                }
            }
            other => return Err(LabelError::UnknownType(other.to_string())),
        };

        if let Some(extra) = owned.keys().next() {
            return Err(LabelError::Unexpected(extra.to_string()));
        }

        Ok(Self { rack, version, app, release, name, hostname, kind })
    }
}

/// Label selector handed to the container engine.
///
/// An instance matches when its labels contain every pair of the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter(BTreeMap<String, String>);

impl LabelFilter {
    /// Everything running on the given rack
    pub fn rack(rack: impl Into<String>) -> Self {
        Self(BTreeMap::from([(RACK.to_string(), rack.into())]))
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.0.insert(APP.to_string(), app.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}
