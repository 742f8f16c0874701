//! Session summary sinks.
//!
//! `FileSummarySink` writes one markdown file per session under a directory
//! and reads back the newest by modification time. `NoopSummarySink`
//! discards everything.

use async_trait::async_trait;
use chrono::Utc;
use clawloop_core::error::StoreError;
use clawloop_core::summary::SummarySink;
use clawloop_core::todo::SessionId;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

use crate::session_file_name;

pub struct FileSummarySink {
    dir: PathBuf,
}

impl FileSummarySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SummarySink for FileSummarySink {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, session: &SessionId, summary: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to create summary directory: {e}"))
        })?;

        let path = self.dir.join(format!("{}.md", session_file_name(session)));
        let body = format!(
            "<!-- session: {session} saved: {} -->\n{summary}\n",
            Utc::now().to_rfc3339()
        );

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write summary: {e}")))?;
        debug!(path = %path.display(), "Session summary saved");
        Ok(())
    }

    async fn latest(&self) -> Result<Option<String>, StoreError> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Storage(format!("Failed to list summaries: {e}"))),
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read summary entry: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }

        let Some((_, path)) = newest else {
            return Ok(None);
        };
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read summary: {e}")))?;

        // Drop the header comment line.
        let body = content
            .lines()
            .skip_while(|l| l.starts_with("<!--"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Some(body.trim().to_string()).filter(|s| !s.is_empty()))
    }
}

/// A sink that stores nothing.
pub struct NoopSummarySink;

#[async_trait]
impl SummarySink for NoopSummarySink {
    fn name(&self) -> &str {
        "none"
    }

    async fn save(&self, _session: &SessionId, _summary: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_latest() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSummarySink::new(dir.path());
        sink.save(&SessionId::from("s1"), "Fixed the parser; tests pending.")
            .await
            .unwrap();

        let latest = sink.latest().await.unwrap();
        assert_eq!(latest.as_deref(), Some("Fixed the parser; tests pending."));
    }

    #[tokio::test]
    async fn missing_directory_means_no_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSummarySink::new(dir.path().join("absent"));
        assert!(sink.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn noop_sink_remembers_nothing() {
        let sink = NoopSummarySink;
        sink.save(&SessionId::from("s"), "text").await.unwrap();
        assert!(sink.latest().await.unwrap().is_none());
    }
}
