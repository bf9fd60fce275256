// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod docker_engine;
pub mod manifest_store;
pub mod log_sink;
pub mod route_table;

pub use docker_engine::DockerEngine;
pub use log_sink::{FileLogSink, InMemoryLogSink};
pub use manifest_store::{InMemoryManifestStore, YamlManifestStore};
pub use route_table::{FileRouteTable, InMemoryRouter};
