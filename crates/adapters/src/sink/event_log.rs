//! Append-only error log of unhealthy instances.

use std::path::{Path, PathBuf};

use elbenwald_core::error::LogWriteError;
use elbenwald_core::pipeline::EventLogSink;
use elbenwald_core::types::UnhealthyEvent;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Appends one line per event to a file, never truncating it.
///
/// Each batch is written with a single `write_all` while holding the lock,
/// so concurrent checks sharing the log never interleave lines.
#[derive(Debug)]
pub struct AppendFileEventLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AppendFileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<tokio::fs::File, LogWriteError> {
        let open_err = |source| LogWriteError::Open {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(open_err)?;
        }

        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(open_err)
    }
}

impl EventLogSink for AppendFileEventLog {
    async fn append(
        &self,
        load_balancer: &str,
        events: &[UnhealthyEvent],
    ) -> Result<(), LogWriteError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut batch = String::new();
        for event in events {
            batch.push_str(&event.log_line(load_balancer));
            batch.push('\n');
        }

        let write_err = |source| LogWriteError::Write {
            path: self.path.clone(),
            source,
        };

        let _guard = self.lock.lock().await;
        let mut file = self.open().await?;
        file.write_all(batch.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        debug!(
            load_balancer,
            events = events.len(),
            path = %self.path.display(),
            "appended unhealthy events"
        );
        Ok(())
    }
}
