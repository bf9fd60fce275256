// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod app_locks;
pub mod desired_state;
pub mod converge;
pub mod prune;
pub mod reconcile_loop;

// Re-export use cases for convenience
pub use app_locks::AppLocks;
pub use converge::{ConvergeReport, Reconciler};
pub use desired_state::{DesiredStateBuilder, RackIdentity};
pub use prune::{PruneReport, Pruner};
pub use reconcile_loop::{CycleSummary, ReconcileLoop};
