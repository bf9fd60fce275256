// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manifest store implementations
//!
//! - [`InMemoryManifestStore`]: development and tests
//! - [`YamlManifestStore`]: single-node racks, one directory per app:
//!
//! ```text
//! <root>/<app>/app.yaml              # { release: RABC123 }
//! <root>/<app>/releases/RABC123.yaml # { id, build, env, created, manifest }
//! ```

use crate::domain::manifest::{AppSummary, Manifest, Release, ResolvedManifest};
use crate::domain::manifest_store::{ManifestStore, ManifestStoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct AppRecord {
    active: Option<String>,
    releases: HashMap<String, (Manifest, Release)>,
}

#[derive(Clone, Default)]
pub struct InMemoryManifestStore {
    apps: Arc<RwLock<BTreeMap<String, AppRecord>>>,
}

impl InMemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a release and make it the app's active release
    pub fn promote(&self, manifest: Manifest, release: Release) {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        let record = apps.entry(release.app.clone()).or_default();
        record.active = Some(release.id.clone());
        record.releases.insert(release.id.clone(), (manifest, release));
    }

    /// Store a release without activating it
    pub fn add_release(&self, manifest: Manifest, release: Release) {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.entry(release.app.clone())
            .or_default()
            .releases
            .insert(release.id.clone(), (manifest, release));
    }

    pub fn delete_app(&self, app: &str) {
        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        apps.remove(app);
    }
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
    async fn resolve(&self, app: &str) -> Result<ResolvedManifest, ManifestStoreError> {
        let active = {
            let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
            let record = apps
                .get(app)
                .ok_or_else(|| ManifestStoreError::AppNotFound(app.to_string()))?;
            record
                .active
                .clone()
                .ok_or_else(|| ManifestStoreError::NoActiveRelease(app.to_string()))?
        };

        self.resolve_release(app, &active).await
    }

    async fn resolve_release(&self, app: &str, release: &str) -> Result<ResolvedManifest, ManifestStoreError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        let record = apps
            .get(app)
            .ok_or_else(|| ManifestStoreError::AppNotFound(app.to_string()))?;
        let (manifest, release) = record.releases.get(release).ok_or_else(|| {
            ManifestStoreError::ReleaseNotFound {
                app: app.to_string(),
                release: release.to_string(),
            }
        })?;

        Ok(ResolvedManifest {
            manifest: manifest.clone().with_env(release.env.clone()),
            release: release.clone(),
        })
    }

    async fn list_applications(&self) -> Result<Vec<AppSummary>, ManifestStoreError> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        Ok(apps
            .iter()
            .map(|(name, record)| AppSummary {
                name: name.clone(),
                release: record.active.clone(),
            })
            .collect())
    }
}

/// `<root>/<app>/app.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// `<root>/<app>/releases/<id>.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub id: String,
    pub build: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub manifest: Manifest,
}

const APP_FILE: &str = "app.yaml";
const RELEASES_DIR: &str = "releases";

pub struct YamlManifestStore {
    root: PathBuf,
}

impl YamlManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn app_dir(&self, app: &str) -> Result<PathBuf, ManifestStoreError> {
        Ok(self.root.join(path_segment("app", app)?))
    }

    fn release_path(&self, app: &str, release: &str) -> Result<PathBuf, ManifestStoreError> {
        Ok(self
            .app_dir(app)?
            .join(RELEASES_DIR)
            .join(format!("{}.yaml", path_segment("release", release)?)))
    }

    async fn read_app_file(&self, app: &str) -> Result<AppFile, ManifestStoreError> {
        let path = self.app_dir(app)?.join(APP_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestStoreError::AppNotFound(app.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write a release file and optionally activate it
    pub async fn write_release(&self, app: &str, release: &ReleaseFile, activate: bool) -> Result<(), ManifestStoreError> {
        let release_path = self.release_path(app, &release.id)?;
        if let Some(releases) = release_path.parent() {
            tokio::fs::create_dir_all(releases).await?;
        }
        tokio::fs::write(&release_path, serde_yaml::to_string(release)?).await?;

        let app_path = self.app_dir(app)?.join(APP_FILE);
        if activate || !tokio::fs::try_exists(&app_path).await? {
            let app_file = AppFile {
                release: activate.then(|| release.id.clone()),
            };
            tokio::fs::write(app_path, serde_yaml::to_string(&app_file)?).await?;
        }

        Ok(())
    }
}

/// App and release names become single path components under the root
fn path_segment<'a>(kind: &'static str, value: &'a str) -> Result<&'a str, ManifestStoreError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if invalid {
        return Err(ManifestStoreError::InvalidName {
            kind,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[async_trait]
impl ManifestStore for YamlManifestStore {
    async fn resolve(&self, app: &str) -> Result<ResolvedManifest, ManifestStoreError> {
        let release = self
            .read_app_file(app)
            .await?
            .release
            .ok_or_else(|| ManifestStoreError::NoActiveRelease(app.to_string()))?;

        self.resolve_release(app, &release).await
    }

    async fn resolve_release(&self, app: &str, release: &str) -> Result<ResolvedManifest, ManifestStoreError> {
        let path = self.release_path(app, release)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestStoreError::ReleaseNotFound {
                    app: app.to_string(),
                    release: release.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let file: ReleaseFile = serde_yaml::from_str(&content)?;
        debug!(app, release = %file.id, "Loaded release manifest");

        Ok(ResolvedManifest {
            manifest: file.manifest.with_env(file.env.clone()),
            release: Release {
                id: file.id,
                app: app.to_string(),
                build: file.build,
                env: file.env,
                created: file.created,
            },
        })
    }

    async fn list_applications(&self) -> Result<Vec<AppSummary>, ManifestStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // An absent root is a misconfiguration, not a rack without apps
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestStoreError::Unavailable(format!(
                    "manifest directory {} does not exist",
                    self.root.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut apps = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !tokio::fs::try_exists(entry.path().join(APP_FILE)).await? {
                continue;
            }

            let app_file = self.read_app_file(&name).await?;
            apps.push(AppSummary {
                name,
                release: app_file.release,
            });
        }

        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }
}
