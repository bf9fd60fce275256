// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reconciliation error taxonomy
//!
//! Converge and the desired-state builder fail fast: the first
//! [`ReconcileError`] aborts the pass and reaches the caller wrapped in an
//! [`OperationError`] naming the operation and application. Prune stop
//! failures are the one ignorable path and travel as [`IgnoredStopFailure`]
//! values instead.

use crate::domain::engine::EngineError;
use crate::domain::instance::InstanceId;
use crate::domain::manifest::ManifestError;
use crate::domain::manifest_store::ManifestStoreError;
use crate::domain::resource_catalog::UnknownResourceType;
use crate::domain::routing::RouterError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("failed to resolve manifest for {app}: {source}")]
    ManifestResolution {
        app: String,
        #[source]
        source: ManifestStoreError,
    },

    #[error("failed to resolve environment for service {service}: {source}")]
    EnvironmentResolution {
        service: String,
        #[source]
        source: ManifestError,
    },

    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to apply routes: {0}")]
    RoutingApply(#[from] RouterError),
}

impl From<UnknownResourceType> for ReconcileError {
    fn from(err: UnknownResourceType) -> Self {
        ReconcileError::UnknownResourceType(err.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Converge,
    Prune,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Converge => f.write_str("converge"),
            Operation::Prune => f.write_str("prune"),
        }
    }
}

/// First failure of a converge or prune pass, with the context needed to
/// diagnose it
#[derive(Debug)]
pub struct OperationError {
    pub operation: Operation,
    /// `None` for rack-wide operations
    pub app: Option<String>,
    pub source: ReconcileError,
}

impl OperationError {
    pub fn converge(app: &str, source: impl Into<ReconcileError>) -> Self {
        Self {
            operation: Operation::Converge,
            app: Some(app.to_string()),
            source: source.into(),
        }
    }

    pub fn prune(source: impl Into<ReconcileError>) -> Self {
        Self {
            operation: Operation::Prune,
            app: None,
            source: source.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.app {
            Some(app) => write!(f, "{} failed for app {}: {}", self.operation, app, self.source),
            None => write!(f, "{} failed: {}", self.operation, self.source),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A stop request the pruner gave up on; the sweep carries on past it
#[derive(Debug, Clone)]
pub struct IgnoredStopFailure {
    pub id: InstanceId,
    pub app: Option<String>,
    pub error: EngineError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_context() {
        let err = OperationError::converge("shop", UnknownResourceType("memcached".to_string()));
        assert_eq!(
            err.to_string(),
            "converge failed for app shop: unknown resource type: memcached"
        );

        let err = OperationError::prune(EngineError::List("daemon down".to_string()));
        assert_eq!(
            err.to_string(),
            "prune failed: Failed to list instances: daemon down"
        );
    }
}
