/// Driver state definitions for the discovery state machine
///
/// This module defines the states a session passes through while the driver
/// advances it, and the reasons a session can stop.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of the discovery state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    // ===== Setup =====
    /// Seed URL is being enqueued
    Initialize,

    // ===== Loop States =====
    /// Next URL is being dequeued from the pending queue
    PopNext,

    /// Current page is being fetched and classified
    Classify,

    /// Classification is being mapped to an action
    Decide,

    /// Child links of the current page are being classified and enqueued
    ExploreChildren,

    /// Members are being extracted from the current page
    ExtractMembers,

    /// Current page was judged not worth acting on
    Skip,

    // ===== Terminal State =====
    /// Session is finished
    End,
}

impl DriverState {
    /// Returns true if no further transitions follow this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns true for the three action states that hand back to `PopNext`
    pub fn is_action(&self) -> bool {
        matches!(self, Self::ExploreChildren | Self::ExtractMembers | Self::Skip)
    }

    /// States reachable from this one
    pub fn successors(&self) -> &'static [DriverState] {
        match self {
            Self::Initialize => &[Self::PopNext],
            Self::PopNext => &[Self::Classify, Self::End],
            Self::Classify => &[Self::Decide],
            Self::Decide => &[Self::ExploreChildren, Self::ExtractMembers, Self::Skip, Self::End],
            Self::ExploreChildren | Self::ExtractMembers | Self::Skip => &[Self::PopNext],
            Self::End => &[],
        }
    }

    /// Returns true if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: DriverState) -> bool {
        self.successors().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::PopNext => "pop_next",
            Self::Classify => "classify",
            Self::Decide => "decide",
            Self::ExploreChildren => "explore_children",
            Self::ExtractMembers => "extract_members",
            Self::Skip => "skip",
            Self::End => "end",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// The pending queue ran dry
    Exhausted,

    /// The configured step budget was used up
    StepBudget,

    /// The wall-clock deadline passed
    Deadline,

    /// An unexpected failure inside a step
    Failed,
}

impl Termination {
    /// Returns true if the session may still have unexplored pending URLs
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::StepBudget => "step_budget",
            Self::Deadline => "deadline",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
