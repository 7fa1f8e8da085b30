//! The published job snapshot: one JSON document replaced wholesale per run.

use chrono::{DateTime, Utc};
use jobscout_core::{CoreError, JobPosting, SnapshotError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub jobs: Vec<JobPosting>,
    pub count: usize,
    pub generated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(jobs: Vec<JobPosting>) -> Self {
        Self {
            count: jobs.len(),
            jobs,
            generated_at: Some(Utc::now()),
        }
    }

    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            count: 0,
            generated_at: None,
        }
    }

    pub fn recent_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.recently_posted == Some(true))
            .count()
    }
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the snapshot with `jobs`.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so a reader sees either the previous snapshot or this one.
    pub async fn write(&self, jobs: &[JobPosting]) -> Result<Snapshot, CoreError> {
        let snapshot = Snapshot::new(jobs.to_vec());
        let body = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(dir) = self.parent_dir() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.write_failed(e))?;
        }

        let temp = self.temp_path();
        if let Err(e) = tokio::fs::write(&temp, &body).await {
            return Err(self.write_failed(e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                warn!("Could not remove {}: {}", temp.display(), cleanup);
            }
            return Err(self.write_failed(e));
        }

        info!(
            "Wrote {} jobs ({} bytes) to {}",
            snapshot.count,
            body.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    /// Current snapshot, or an empty one if none has been written yet.
    pub async fn read(&self) -> Result<Snapshot, CoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {} yet", self.path.display());
                return Ok(Snapshot::empty());
            }
            Err(e) => return Err(self.read_failed(e.to_string())),
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&raw).map_err(|e| self.read_failed(e.to_string()))?;
        if snapshot.count != snapshot.jobs.len() {
            warn!(
                "Snapshot {} claims {} jobs but holds {}",
                self.path.display(),
                snapshot.count,
                snapshot.jobs.len()
            );
        }
        Ok(snapshot)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let temp_name = format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple());
        match self.parent_dir() {
            Some(dir) => dir.join(temp_name),
            None => PathBuf::from(temp_name),
        }
    }

    fn write_failed(&self, e: std::io::Error) -> CoreError {
        SnapshotError::WriteFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    }

    fn read_failed(&self, reason: String) -> CoreError {
        SnapshotError::ReadFailed {
            path: self.path.display().to_string(),
            reason,
        }
        .into()
    }
}
