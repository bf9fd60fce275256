// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::instance::{InstanceId, ObservedInstance, WorkloadInstance};
use crate::domain::labels::LabelFilter;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur talking to the container engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Failed to connect to container engine: {0}")]
    Connection(String),

    #[error("Failed to start {name}: {reason}")]
    Start { name: String, reason: String },

    #[error("Failed to list instances: {0}")]
    List(String),

    #[error("Failed to stop {id}: {reason}")]
    Stop { id: InstanceId, reason: String },
}

/// The container engine the rack runs workloads on.
///
/// Calls are not transactional; callers serialize mutations per application
/// (see `crate::application::app_locks`).
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create and start an instance, returning the engine-assigned id.
    async fn start(&self, instance: &WorkloadInstance) -> Result<InstanceId, EngineError>;

    /// Running instances whose labels contain every pair in `filter`.
    async fn list_by_labels(&self, filter: &LabelFilter) -> Result<Vec<ObservedInstance>, EngineError>;

    /// Stop a running instance.
    async fn stop(&self, id: &InstanceId) -> Result<(), EngineError>;
}
