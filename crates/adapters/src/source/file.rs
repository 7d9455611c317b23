//! Snapshot files on disk: `<snapshot_dir>/<load_balancer>.json`.

use std::path::{Path, PathBuf};

use elbenwald_core::error::DataSourceError;
use elbenwald_core::pipeline::HealthDataSource;
use elbenwald_core::types::InstanceHealthRecord;
use tracing::debug;

use super::parse_snapshot;

/// Reads health snapshots written by an external exporter.
#[derive(Debug, Clone)]
pub struct FileSource {
    snapshot_dir: PathBuf,
}

impl FileSource {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
        }
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Snapshot path of `load_balancer`.
    ///
    /// Names that could leave the snapshot directory are rejected.
    fn snapshot_path(&self, load_balancer: &str) -> Result<PathBuf, DataSourceError> {
        if load_balancer.is_empty()
            || load_balancer == "."
            || load_balancer == ".."
            || load_balancer.contains(['/', '\\', '\0'])
        {
            return Err(DataSourceError::UnknownLoadBalancer(format!(
                "invalid load balancer name '{load_balancer}'"
            )));
        }
        Ok(self.snapshot_dir.join(format!("{load_balancer}.json")))
    }
}

impl HealthDataSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_instance_health(
        &self,
        load_balancer: &str,
    ) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
        let path = self.snapshot_path(load_balancer)?;
        debug!(path = %path.display(), "reading health snapshot");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DataSourceError::UnknownLoadBalancer(load_balancer.to_owned())
            } else {
                DataSourceError::Unavailable(format!("cannot read {}: {e}", path.display()))
            }
        })?;

        parse_snapshot(&content)
    }
}
