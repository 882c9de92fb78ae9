use crate::model::classification::validate_confidence;
use crate::url::{normalize, NormalizedUrl};
use crate::RosterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default minimum confidence for acting on a classification
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Default maximum number of driver iterations per session
pub const DEFAULT_STEP_BUDGET: u32 = 500;

/// One roster discovery run for a single organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub seed_url: String,
    pub party_name: String,
    pub party_id: i64,
    pub max_depth: u32,
    pub step_budget: u32,
    pub confidence_threshold: f64,

    /// Optional wall-clock cutoff for the whole session
    #[serde(default)]
    pub deadline: Option<Duration>,
}

impl DiscoveryRequest {
    /// Creates a request with default budget and threshold
    pub fn new(
        seed_url: impl Into<String>,
        party_name: impl Into<String>,
        party_id: i64,
        max_depth: u32,
    ) -> Self {
        Self {
            seed_url: seed_url.into(),
            party_name: party_name.into(),
            party_id,
            max_depth,
            step_budget: DEFAULT_STEP_BUDGET,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            deadline: None,
        }
    }

    pub fn with_step_budget(mut self, step_budget: u32) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Validates the request and returns the normalized seed URL
    ///
    /// An invalid or missing seed URL is the only hard failure surfaced to
    /// the caller at session start.
    pub fn validated_seed(&self) -> Result<NormalizedUrl, RosterError> {
        validate_confidence(self.confidence_threshold)?;
        Ok(normalize(&self.seed_url)?)
    }
}

/// Context handed to classifiers and extractors alongside the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationContext {
    pub party_name: String,
    pub party_id: i64,
    pub depth: u32,
    pub max_depth: u32,
}
