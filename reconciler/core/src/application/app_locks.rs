// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Per-application mutual exclusion
//!
//! Converge and prune both mutate the container engine, whose create, list
//! and stop calls are not transactional. Holding the lock for an application
//! guarantees no other converge or prune touches that application's instances
//! at the same time. Different applications proceed in parallel.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Clone, Default)]
pub struct AppLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AppLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `app`. Access ends when the guard drops.
    pub async fn lock(&self, app: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held across the await
        let mutex = self
            .locks
            .entry(app.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        debug!(app, "Waiting for application lock");
        mutex.lock_owned().await
    }

    /// Drop the lock for an application that no longer exists.
    ///
    /// Kept while anyone holds or waits on it; the next `lock` call for the
    /// name creates a fresh one.
    pub fn forget(&self, app: &str) {
        if self
            .locks
            .remove_if(app, |_, mutex| Arc::strong_count(mutex) == 1)
            .is_some()
        {
            debug!(app, "Dropped application lock");
        }
    }

    /// Number of applications with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
