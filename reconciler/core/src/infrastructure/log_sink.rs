// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::log_sink::{LogSink, LogSinkError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

/// Appends each stream to a file under `root`, e.g.
/// `<root>/apps/shop/releases/R1/log`
pub struct FileLogSink {
    root: PathBuf,
}

impl FileLogSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_path(&self, stream: &str) -> PathBuf {
        // Stream keys are relative; never escape the root
        let relative: PathBuf = stream
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect();
        self.root.join(relative)
    }
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn append(&self, stream: &str, payload: &[u8]) -> Result<(), LogSinkError> {
        let err = |e: std::io::Error| LogSinkError::Append {
            stream: stream.to_string(),
            reason: e.to_string(),
        };

        let path = self.resolve_path(stream);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(err)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(err)?;
        file.write_all(payload).await.map_err(err)?;
        file.flush().await.map_err(err)?;

        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLogSink {
    streams: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a stream as text
    pub fn read(&self, stream: &str) -> String {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams
            .get(stream)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LogSink for InMemoryLogSink {
    async fn append(&self, stream: &str, payload: &[u8]) -> Result<(), LogSinkError> {
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.entry(stream.to_string()).or_default().extend_from_slice(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::log_sink::release_log_stream;

    #[tokio::test]
    async fn test_file_sink_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = FileLogSink::new(temp_dir.path());
        let stream = release_log_stream("shop", "R1");

        sink.append(&stream, b"starting: a\n").await.unwrap();
        sink.append(&stream, b"starting: b\n").await.unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join("apps/shop/releases/R1/log")).unwrap();
        assert_eq!(content, "starting: a\nstarting: b\n");
    }

    #[tokio::test]
    async fn test_file_sink_stays_under_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sink = FileLogSink::new(temp_dir.path().join("logs"));

        sink.append("../escape/log", b"x").await.unwrap();
        assert!(temp_dir.path().join("logs/escape/log").exists());
    }

    #[tokio::test]
    async fn test_in_memory_sink() {
        let sink = InMemoryLogSink::new();
        sink.append("s", b"one ").await.unwrap();
        sink.append("s", b"two").await.unwrap();
        assert_eq!(sink.read("s"), "one two");
        assert_eq!(sink.read("other"), "");
    }
}
