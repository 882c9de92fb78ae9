//! Run statistics
//!
//! This module aggregates finished sessions into run-wide counters and
//! prints them to the console.

use crate::state::{RosterDiscoverySession, Termination};
use std::collections::HashMap;

/// Run-wide statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Number of sessions that ran
    pub sessions: usize,

    /// Number of requests rejected before a session started
    pub rejected: usize,

    /// Members found across all sessions
    pub total_members: usize,

    /// Pages visited across all sessions
    pub total_visited: usize,

    /// URLs still pending across all sessions
    pub total_pending: usize,

    /// Duplicate members dropped across all sessions
    pub duplicates_dropped: usize,

    /// Count of sessions by termination reason
    pub by_termination: HashMap<Termination, usize>,

    /// Failed sessions as (party id, error)
    pub failures: Vec<(i64, String)>,
}

impl RunStatistics {
    /// Aggregates finished sessions
    pub fn from_sessions(sessions: &[RosterDiscoverySession], rejected: usize) -> Self {
        let mut stats = Self {
            sessions: sessions.len(),
            rejected,
            ..Self::default()
        };

        for session in sessions {
            stats.total_members += session.results().len();
            stats.total_visited += session.visited_count();
            stats.total_pending += session.pending_count();
            stats.duplicates_dropped += session.duplicates_dropped();

            if let Some(termination) = session.termination() {
                *stats.by_termination.entry(termination).or_insert(0) += 1;
            }
            if let Some(error) = session.error() {
                stats.failures.push((session.party_id(), error.to_string()));
            }
        }

        stats
    }

    pub fn count(&self, termination: Termination) -> usize {
        self.by_termination.get(&termination).copied().unwrap_or(0)
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Discovery Statistics ===\n");

    println!("Overview:");
    println!("  Sessions run: {}", stats.sessions);
    if stats.rejected > 0 {
        println!("  Requests rejected: {}", stats.rejected);
    }
    println!("  Members found: {}", stats.total_members);
    println!("  Duplicates dropped: {}", stats.duplicates_dropped);
    println!("  Pages visited: {}", stats.total_visited);
    println!("  URLs left pending: {}", stats.total_pending);
    println!();

    println!("Sessions by Outcome:");
    for termination in [
        Termination::Exhausted,
        Termination::StepBudget,
        Termination::Deadline,
        Termination::Failed,
    ] {
        let count = stats.count(termination);
        if count > 0 {
            println!("  {}: {}", termination, count);
        }
    }
    println!();

    if !stats.failures.is_empty() {
        println!("Failures:");
        for (party_id, error) in &stats.failures {
            println!("  party {}: {}", party_id, error);
        }
        println!();
    }
}
