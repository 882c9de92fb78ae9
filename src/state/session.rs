//! Roster discovery session
//!
//! A session is a plain value: it owns its visited set, its FIFO pending
//! queue and its accumulated results, with no handles to anything outside.
//! The driver advances it by cloning, mutating the clone, and keeping the
//! clone only when a whole step succeeded.

use crate::model::{DiscoveryRequest, RosterMember};
use crate::state::Termination;
use crate::url::NormalizedUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// A URL waiting in the pending queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUrl {
    pub url: NormalizedUrl,
    pub depth: u32,
}

/// State of one discovery run for a single organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterDiscoverySession {
    current_url: Option<NormalizedUrl>,
    party_name: String,
    party_id: i64,
    max_depth: u32,
    depth: u32,
    visited: HashSet<NormalizedUrl>,
    pending: VecDeque<PendingUrl>,
    results: Vec<RosterMember>,
    error: Option<String>,

    /// Members dropped because a member with the same name was already present
    duplicates_dropped: usize,

    /// Number of pages the driver has fully processed
    steps_taken: u32,

    termination: Option<Termination>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl RosterDiscoverySession {
    /// Creates an empty session with nothing queued
    pub fn new(party_name: impl Into<String>, party_id: i64, max_depth: u32) -> Self {
        Self {
            current_url: None,
            party_name: party_name.into(),
            party_id,
            max_depth,
            depth: 0,
            visited: HashSet::new(),
            pending: VecDeque::new(),
            results: Vec::new(),
            error: None,
            duplicates_dropped: 0,
            steps_taken: 0,
            termination: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Creates a session for a request, with the seed enqueued at depth 0
    pub fn for_request(request: &DiscoveryRequest, seed: NormalizedUrl) -> Self {
        let mut session = Self::new(&request.party_name, request.party_id, request.max_depth);
        session.enqueue(seed, 0);
        session
    }

    /// Adds a URL to the back of the pending queue
    ///
    /// Returns false without queueing when the URL was already visited, is
    /// already pending, or `depth` exceeds the session's maximum depth.
    pub fn enqueue(&mut self, url: NormalizedUrl, depth: u32) -> bool {
        if depth > self.max_depth {
            tracing::trace!(url = %url, depth, max_depth = self.max_depth, "Depth exceeded, not queueing");
            return false;
        }

        if self.visited.contains(&url) || self.pending.iter().any(|p| p.url == url) {
            return false;
        }

        self.pending.push_back(PendingUrl { url, depth });
        true
    }

    /// Dequeues the next unvisited URL, marks it visited and makes it current
    ///
    /// Entries whose URL was visited after they were queued are discarded.
    pub fn pop_next(&mut self) -> Option<PendingUrl> {
        while let Some(next) = self.pending.pop_front() {
            if self.visited.insert(next.url.clone()) {
                self.current_url = Some(next.url.clone());
                self.depth = next.depth;
                return Some(next);
            }
        }

        None
    }

    /// Appends a member unless one with the same name is already present
    ///
    /// Returns false, and counts the drop, for duplicates.
    pub fn add_member(&mut self, member: RosterMember) -> bool {
        if self.results.iter().any(|m| m.name() == member.name()) {
            self.duplicates_dropped += 1;
            return false;
        }

        self.results.push(member);
        true
    }

    /// Records that the driver completed one step
    pub fn record_step(&mut self) {
        self.steps_taken += 1;
    }

    /// Marks the session finished for the given reason
    pub fn finish(&mut self, termination: Termination) {
        self.termination = Some(termination);
        self.finished_at = Some(Utc::now());
    }

    /// Returns a copy of this session carrying a driver failure
    ///
    /// The receiver is left untouched.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        let mut failed = self.clone();
        failed.error = Some(error.into());
        failed.finish(Termination::Failed);
        failed
    }

    /// Clears termination data so a snapshot can be driven again
    pub fn reopen(&mut self) {
        self.termination = None;
        self.finished_at = None;
        self.error = None;
    }

    pub fn is_visited(&self, url: &NormalizedUrl) -> bool {
        self.visited.contains(url)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn visited(&self) -> &HashSet<NormalizedUrl> {
        &self.visited
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingUrl> {
        self.pending.iter()
    }

    pub fn results(&self) -> &[RosterMember] {
        &self.results
    }

    pub fn current_url(&self) -> Option<&NormalizedUrl> {
        self.current_url.as_ref()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn party_name(&self) -> &str {
        &self.party_name
    }

    pub fn party_id(&self) -> i64 {
        self.party_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn steps_taken(&self) -> u32 {
        self.steps_taken
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}
