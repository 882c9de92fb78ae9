//! Output handler traits and types
//!
//! This module defines the sink interface fed by the coordinator and the
//! report model built from a finished session.

use crate::model::RosterMember;
use crate::state::{RosterDiscoverySession, Termination};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Presentation view of one finished session
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub party_id: i64,
    pub party_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub termination: Option<Termination>,
    pub error: Option<String>,

    pub steps_taken: u32,
    pub visited_count: usize,
    pub pending_count: usize,
    pub duplicates_dropped: usize,

    pub members: Vec<RosterMember>,
}

impl DiscoveryReport {
    pub fn from_session(session: &RosterDiscoverySession) -> Self {
        let duration_seconds = session
            .finished_at()
            .map(|finished| (finished - session.started_at()).num_seconds());

        Self {
            party_id: session.party_id(),
            party_name: session.party_name().to_string(),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
            duration_seconds,
            termination: session.termination(),
            error: session.error().map(str::to_string),
            steps_taken: session.steps_taken(),
            visited_count: session.visited_count(),
            pending_count: session.pending_count(),
            duplicates_dropped: session.duplicates_dropped(),
            members: session.results().to_vec(),
        }
    }

    /// True if the session stopped before its queue ran dry
    pub fn is_partial(&self) -> bool {
        self.termination.map_or(true, |t| t.is_partial())
    }

    pub fn status(&self) -> &'static str {
        self.termination.map_or("running", |t| t.as_str())
    }
}

/// Sink for finished sessions
///
/// Handlers are driven from a single task, one session at a time, so they
/// need no internal locking.
pub trait OutputHandler: Send {
    /// Records one finished session
    fn record_session(&mut self, session: &RosterDiscoverySession) -> OutputResult<()>;

    /// Writes anything buffered once every session has been recorded
    fn finalize(&mut self) -> OutputResult<()>;
}
