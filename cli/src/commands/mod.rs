// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for rackd

pub mod config;
pub mod converge;
pub mod prune;
pub mod run;

pub use self::config::ConfigCommand;
