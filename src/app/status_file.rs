//! Status file for external monitoring.
//!
//! The status trigger writes the latest [`StatusSnapshot`] as JSON so tools
//! without HTTP access can poll the running quoter.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::stats::StatusSnapshot;
use crate::error::Result;

/// Current status file format version.
const STATUS_VERSION: &str = "1";

/// Top-level status file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusFile {
    /// Schema version for forward compatibility.
    pub version: String,
    pub pid: u32,
    /// NEAR network the loop is watching.
    pub network: String,
    /// Contract whose events are watched.
    pub contract: String,
    pub dry_run: bool,
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
}

/// Static part of the status file, fixed at startup.
#[derive(Debug, Clone)]
pub struct StatusHeader {
    pub network: String,
    pub contract: String,
    pub dry_run: bool,
}

pub struct StatusWriter {
    path: PathBuf,
    header: StatusHeader,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: PathBuf, header: StatusHeader) -> Self {
        Self { path, header }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Write `snapshot` atomically (temp file then rename).
    ///
    /// Creates the parent directory if it doesn't exist.
    #[allow(clippy::result_large_err)]
    pub fn write(&self, snapshot: StatusSnapshot) -> Result<()> {
        let status = StatusFile {
            version: STATUS_VERSION.to_string(),
            pid: std::process::id(),
            network: self.header.network.clone(),
            contract: self.header.contract.clone(),
            dry_run: self.header.dry_run,
            snapshot,
        };
        let json = serde_json::to_string_pretty(&status)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stats::LoopStats;

    fn header() -> StatusHeader {
        StatusHeader {
            network: "testnet".into(),
            contract: "amm.iqai.testnet".into(),
            dry_run: true,
        }
    }

    #[test]
    fn writes_and_replaces_status_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.json");
        let writer = StatusWriter::new(path.clone(), header());
        let stats = LoopStats::new(7);

        writer.write(stats.snapshot()).unwrap();
        stats.set_cursor(9);
        writer.write(stats.snapshot()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["network"], "testnet");
        assert_eq!(value["cursor"], 9);
        assert_eq!(value["dry_run"], true);
        assert!(!path.with_extension("tmp").exists());
    }
}
