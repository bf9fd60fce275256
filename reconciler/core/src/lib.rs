// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Rack Reconciler Core
//!
//! Computes the workload instances an application should have, compares them
//! with what the container engine reports, and drives the engine toward the
//! desired state.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Desired-state derivation, converge, prune

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
