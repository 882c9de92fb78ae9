//! JSON session snapshots
//!
//! Finished sessions are written verbatim, visited set and pending queue
//! included, so a later run can resume any that stopped early.

use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use crate::state::RosterDiscoverySession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of a snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub written_at: DateTime<Utc>,

    /// Hash of the configuration the sessions ran under
    #[serde(default)]
    pub config_hash: Option<String>,

    pub sessions: Vec<RosterDiscoverySession>,
}

impl SnapshotFile {
    /// Splits sessions into those to resume and those to keep as they are
    ///
    /// A session is resumable when it stopped with URLs still pending and,
    /// if `party` is given, belongs to that party.
    pub fn split_resumable(
        self,
        party: Option<i64>,
    ) -> (Vec<RosterDiscoverySession>, Vec<RosterDiscoverySession>) {
        self.sessions.into_iter().partition(|session| {
            party.map_or(true, |id| session.party_id() == id) && session.has_pending()
        })
    }
}

/// Reads a snapshot file written by `JsonSnapshotHandler`
pub fn load_snapshots(path: &Path) -> OutputResult<SnapshotFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes sessions to a snapshot file
///
/// The file is written to a sibling temporary path first and renamed into
/// place, so an interrupted write never leaves a truncated snapshot.
pub fn write_snapshots(path: &Path, snapshot: &SnapshotFile) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(snapshot)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| OutputError::Write(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Buffers finished sessions and writes them as one snapshot on finalize
pub struct JsonSnapshotHandler {
    path: PathBuf,
    config_hash: Option<String>,
    sessions: Vec<RosterDiscoverySession>,
}

impl JsonSnapshotHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config_hash: None,
            sessions: Vec::new(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}

impl OutputHandler for JsonSnapshotHandler {
    fn record_session(&mut self, session: &RosterDiscoverySession) -> OutputResult<()> {
        self.sessions.push(session.clone());
        Ok(())
    }

    fn finalize(&mut self) -> OutputResult<()> {
        self.sessions.sort_by_key(|s| s.party_id());

        let snapshot = SnapshotFile {
            written_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            sessions: std::mem::take(&mut self.sessions),
        };
        write_snapshots(&self.path, &snapshot)?;

        tracing::info!(
            path = %self.path.display(),
            sessions = snapshot.sessions.len(),
            "Wrote session snapshots"
        );
        Ok(())
    }
}
