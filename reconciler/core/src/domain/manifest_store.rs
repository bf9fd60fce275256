// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::manifest::{AppSummary, ResolvedManifest};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestStoreError {
    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("Release {release} not found for app {app}")]
    ReleaseNotFound { app: String, release: String },

    #[error("App {0} has no active release")]
    NoActiveRelease(String),

    #[error("Manifest store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid {kind} name: {value:?}")]
    InvalidName { kind: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ManifestStoreError {
    fn from(err: std::io::Error) -> Self {
        ManifestStoreError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ManifestStoreError {
    fn from(err: serde_yaml::Error) -> Self {
        ManifestStoreError::Serialization(err.to_string())
    }
}

/// Source of application manifests and releases
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Manifest of the app's active release
    async fn resolve(&self, app: &str) -> Result<ResolvedManifest, ManifestStoreError>;

    /// Manifest of a specific release, which need not be the active one
    async fn resolve_release(&self, app: &str, release: &str) -> Result<ResolvedManifest, ManifestStoreError>;

    /// Every application the store knows about
    async fn list_applications(&self) -> Result<Vec<AppSummary>, ManifestStoreError>;
}
