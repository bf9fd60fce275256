// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure data and collaborator contracts for the reconciler.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity scheme, manifest model, collaborator traits

pub mod labels;
pub mod instance;
pub mod resource_catalog;
pub mod manifest;
pub mod manifest_store;
pub mod engine;
pub mod routing;
pub mod log_sink;
pub mod errors;
pub mod rack_config;
