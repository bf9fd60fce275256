// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("Failed to append to {stream}: {reason}")]
    Append { stream: String, reason: String },
}

/// Key of the log stream a release's deployment messages go to
pub fn release_log_stream(app: &str, release: &str) -> String {
    format!("apps/{}/releases/{}/log", app, release)
}

/// Append-only log storage
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, stream: &str, payload: &[u8]) -> Result<(), LogSinkError>;
}
