use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ReconciliationRequest;
use crate::config;
use crate::errors::SyncError;

/// One sync that could not run because the remote was unreachable. Consumed
/// later by a replay command; this module only appends and reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: i64,
    pub timestamp: String,
    pub working_directory: PathBuf,
    pub branch: String,
    pub request: ReconciliationRequest,
}

/// Append-only JSON-lines store at a well-known per-user location. Existing
/// entries are never rewritten or reordered.
pub struct OfflineQueue {
    path: PathBuf,
}

impl OfflineQueue {
    pub fn default_path() -> Option<PathBuf> {
        config::config_dir().map(|dir| dir.join("queue.jsonl"))
    }

    pub fn open_default() -> Result<Self, SyncError> {
        Self::default_path().map(|path| Self { path }).ok_or_else(|| {
            SyncError::Repo("unable to determine a home directory for the offline queue".to_string())
        })
    }

    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        working_directory: &Path,
        branch: &str,
        request: &ReconciliationRequest,
    ) -> Result<i64, SyncError> {
        let now = Utc::now();
        let record = QueuedOperation {
            id: now.timestamp_millis(),
            timestamp: now.to_rfc3339(),
            working_directory: working_directory.to_path_buf(),
            branch: branch.to_string(),
            request: request.clone(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| SyncError::io("failed to create the offline queue directory", err))?;
        }

        let line = serde_json::to_string(&record)
            .map_err(|err| SyncError::io("failed to encode queued sync", std::io::Error::other(err)))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| SyncError::io("failed to open the offline queue", err))?;
        writeln!(file, "{line}")
            .map_err(|err| SyncError::io("failed to append to the offline queue", err))?;

        Ok(record.id)
    }

    pub fn load(&self) -> Result<Vec<QueuedOperation>, SyncError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(SyncError::io("failed to read the offline queue", err)),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|err| {
                    SyncError::io("failed to decode queued sync", std::io::Error::other(err))
                })
            })
            .collect()
    }
}
