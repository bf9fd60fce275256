// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application manifest model
//!
//! The structured, already-parsed view of an application's manifest as the
//! reconciler consumes it, plus the release it belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default)]
    pub services: Vec<Service>,

    /// Release environment the service environments are computed from
    #[serde(skip)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,

    #[serde(rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,

    /// Shell command; empty keeps the image entrypoint
    #[serde(default)]
    pub command: String,

    /// Environment declarations: `KEY`, `KEY=default` or `*`
    #[serde(default)]
    pub environment: Vec<String>,

    #[serde(default)]
    pub port: ServicePort,

    /// Names of the resources this service depends on
    #[serde(default)]
    pub resources: Vec<String>,

    /// Volume specs: `/path` or `host:container`
    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub scale: ServiceScale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub scheme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceScale {
    #[serde(default)]
    pub count: ScaleCount,

    /// Memory in megabytes
    #[serde(default = "default_memory")]
    pub memory: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleCount {
    pub min: u32,
    pub max: u32,
}

impl Default for ScaleCount {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

impl Default for ServiceScale {
    fn default() -> Self {
        Self {
            count: ScaleCount::default(),
            memory: default_memory(),
        }
    }
}

fn default_memory() -> u64 {
    256
}

/// Immutable snapshot of an application's manifest plus build reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub app: String,
    /// Build tag of the service images
    pub build: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub created: DateTime<Utc>,
}

/// A manifest together with the release it was resolved for
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedManifest {
    pub manifest: Manifest,
    pub release: Release,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub name: String,
    /// Active release, if the app has been released
    pub release: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("no such service: {0}")]
    UnknownService(String),

    #[error("required env: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

impl Manifest {
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Compute the environment a service runs with.
    ///
    /// `*` pulls in the whole release environment, `KEY=default` falls back to
    /// the default when the release does not set it, and a bare `KEY` must be
    /// set by the release. The returned map is owned by the caller.
    pub fn service_environment(&self, name: &str) -> Result<BTreeMap<String, String>, ManifestError> {
        let service = self
            .service(name)
            .ok_or_else(|| ManifestError::UnknownService(name.to_string()))?;

        let mut env = BTreeMap::new();
        let mut missing = Vec::new();

        for declaration in &service.environment {
            match declaration.split_once('=') {
                Some((key, default)) => {
                    let value = self.env.get(key).map(String::as_str).unwrap_or(default);
                    env.insert(key.to_string(), value.to_string());
                }
                None if declaration == "*" => {
                    env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                None => match self.env.get(declaration.as_str()) {
                    Some(value) => {
                        env.insert(declaration.clone(), value.clone());
                    }
                    None => missing.push(declaration.clone()),
                },
            }
        }

        if !missing.is_empty() {
            missing.sort();
            return Err(ManifestError::MissingEnv(missing));
        }

        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(environment: &[&str]) -> Manifest {
        Manifest {
            resources: vec![],
            services: vec![Service {
                name: "web".to_string(),
                command: String::new(),
                environment: environment.iter().map(|e| e.to_string()).collect(),
                port: ServicePort::default(),
                resources: vec![],
                volumes: vec![],
                scale: ServiceScale::default(),
            }],
            env: BTreeMap::new(),
        }
        .with_env(BTreeMap::from([
            ("SECRET".to_string(), "s3cr3t".to_string()),
            ("MODE".to_string(), "production".to_string()),
        ]))
    }

    #[test]
    fn test_defaults_and_overrides() {
        let env = manifest(&["MODE=development", "PORT=3000"])
            .service_environment("web")
            .unwrap();

        assert_eq!(env["MODE"], "production");
        assert_eq!(env["PORT"], "3000");
        assert!(!env.contains_key("SECRET"));
    }

    #[test]
    fn test_wildcard_copies_release_env() {
        let env = manifest(&["*"]).service_environment("web").unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env["SECRET"], "s3cr3t");
    }

    #[test]
    fn test_missing_required_env() {
        let err = manifest(&["ZETA", "SECRET", "ALPHA"])
            .service_environment("web")
            .unwrap_err();

        assert_eq!(err, ManifestError::MissingEnv(vec!["ALPHA".to_string(), "ZETA".to_string()]));
        assert_eq!(err.to_string(), "required env: ALPHA, ZETA");
    }

    #[test]
    fn test_unknown_service() {
        assert_eq!(
            manifest(&[]).service_environment("worker"),
            Err(ManifestError::UnknownService("worker".to_string()))
        );
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
resources:
  - name: cache
    type: redis
services:
  - name: web
    port:
      port: 8080
      scheme: http
"#;
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        let web = manifest.service("web").unwrap();

        assert_eq!(manifest.resource("cache").unwrap().resource_type, "redis");
        assert_eq!(web.scale.count.min, 1);
        assert_eq!(web.scale.memory, 256);
        assert!(web.command.is_empty());
    }
}
