// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Backing resource catalog
//!
//! Static lookup tables for the resource types a rack can run locally. The
//! connection URLs are handed to services as `<NAME>_URL` environment
//! variables and must stay byte-stable.

use crate::domain::instance::VolumeMount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Platform suffix of resource DNS names and image namespace
pub const PLATFORM: &str = "convox";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource type: {0}")]
pub struct UnknownResourceType(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Mysql,
    Postgres,
    Redis,
}

impl FromStr for ResourceKind {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::Mysql),
            "postgres" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            other => Err(UnknownResourceType(other.to_string())),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Redis => "redis",
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
            Self::Redis => 6379,
        }
    }

    /// Image the rack runs for this resource type
    pub fn image(&self) -> String {
        format!("{}/{}", PLATFORM, self.as_str())
    }

    pub fn connection_url(&self, app: &str, name: &str) -> String {
        let host = format!("{}.resource.{}.{}", name, app, PLATFORM);
        match self {
            Self::Mysql => format!("mysql://mysql:password@{}:3306/app", host),
            Self::Postgres => format!(
                "postgres://postgres:password@{}:5432/app?sslmode=disable",
                host
            ),
            Self::Redis => format!("redis://{}:6379/0", host),
        }
    }

    /// Durable data directories. Redis keeps nothing on disk.
    pub fn volumes(&self, volume_root: &str, app: &str, name: &str) -> Vec<VolumeMount> {
        let host = format!(
            "{}/{}/resource/{}",
            volume_root.trim_end_matches('/'),
            app,
            name
        );
        match self {
            Self::Mysql => vec![VolumeMount::new(host, "/var/lib/mysql")],
            Self::Postgres => vec![VolumeMount::new(host, "/var/lib/postgresql/data")],
            Self::Redis => vec![],
        }
    }
}

pub fn port_for(kind: &str) -> Result<u16, UnknownResourceType> {
    Ok(kind.parse::<ResourceKind>()?.port())
}

pub fn connection_url_for(app: &str, kind: &str, name: &str) -> Result<String, UnknownResourceType> {
    Ok(kind.parse::<ResourceKind>()?.connection_url(app, name))
}

pub fn volumes_for(
    volume_root: &str,
    app: &str,
    kind: &str,
    name: &str,
) -> Result<Vec<VolumeMount>, UnknownResourceType> {
    Ok(kind.parse::<ResourceKind>()?.volumes(volume_root, app, name))
}
