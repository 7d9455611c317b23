//! JSON-lines report sink.

use std::path::{Path, PathBuf};

use elbenwald_core::config::STDOUT_REPORT_PATH;
use elbenwald_core::error::ReportError;
use elbenwald_core::pipeline::{ReportEnvelope, ReportSink};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Stdout,
    File(PathBuf),
}

/// Writes every report envelope as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesReportSink {
    target: Target,
    lock: Mutex<()>,
}

impl JsonLinesReportSink {
    /// `-` writes to stdout, anything else is a file appended to.
    pub fn new(path: &str) -> Self {
        let target = if path == STDOUT_REPORT_PATH {
            Target::Stdout
        } else {
            Target::File(PathBuf::from(path))
        };
        Self {
            target,
            lock: Mutex::new(()),
        }
    }

    pub fn is_stdout(&self) -> bool {
        self.target == Target::Stdout
    }

    async fn write_stdout(line: &[u8]) -> std::io::Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line).await?;
        stdout.flush().await
    }

    async fn write_file(path: &Path, line: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line).await?;
        file.flush().await
    }
}

impl ReportSink for JsonLinesReportSink {
    async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
        let mut line =
            serde_json::to_vec(envelope).map_err(|e| ReportError::Serialize(e.to_string()))?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        match &self.target {
            Target::Stdout => Self::write_stdout(&line)
                .await
                .map_err(|e| ReportError::Write(format!("stdout: {e}"))),
            Target::File(path) => Self::write_file(path, &line)
                .await
                .map_err(|e| ReportError::Write(format!("{}: {e}", path.display()))),
        }
    }
}
