// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::instance::WorkloadInstance;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RouterError {
    #[error("Failed to write route table: {0}")]
    Write(String),

    #[error("Router rejected topology: {0}")]
    Rejected(String),
}

/// Traffic-routing subsystem that programs ports and load balancing.
#[async_trait]
pub trait Router: Send + Sync {
    /// Replace the routing rules with those of `desired`.
    ///
    /// Always called with the complete desired topology, never a delta, and
    /// must be idempotent.
    async fn apply(&self, desired: &[WorkloadInstance]) -> Result<(), RouterError>;
}
