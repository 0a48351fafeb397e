//! Audit export side-channel.
//!
//! Every completed search or poll can write its full decoded event array to a
//! timestamped JSON file for later inspection. This is an output side-channel
//! only: export failures are logged warnings and never fail the search that
//! produced the data.

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes audit JSON files into a configured directory.
#[derive(Debug, Clone)]
pub struct AuditExporter {
    dir: PathBuf,
    label: String,
}

impl AuditExporter {
    /// Create an exporter writing into `dir`, prefixing file names with
    /// `label` (typically `{run} [{region} {env}]`).
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            label: label.into(),
        }
    }

    /// The export directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `payload` as pretty-printed JSON under a timestamped name.
    ///
    /// Returns the written path for logging; `None` if the export failed.
    pub fn export<T: Serialize>(&self, name: &str, payload: &T) -> Option<PathBuf> {
        let timestamp = Utc::now().format("%Y-%m-%d %H_%M_%S%.3f");
        let file = format!("{} - {} - {}.json", self.label, name, timestamp);
        let path = self.dir.join(file);

        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(error = %err, dir = %self.dir.display(), "audit export directory unavailable");
            return None;
        }

        let json = match serde_json::to_string_pretty(payload) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "audit payload not serializable");
                return None;
            }
        };

        match fs::write(&path, json) {
            Ok(()) => {
                debug!(path = %path.display(), "audit export written");
                Some(path)
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "audit export failed");
                None
            }
        }
    }
}
