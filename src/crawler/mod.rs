//! Crawler module for roster discovery
//!
//! This module contains the core discovery logic, including:
//! - The navigation decision engine
//! - Step handlers wrapping gateway calls
//! - The per-session driver state machine
//! - Concurrent coordination of many sessions

mod coordinator;
mod driver;
pub mod handlers;
mod navigation;

pub use coordinator::{Coordinator, CoordinatorReport, RejectedJob, SessionJob};
pub use driver::{DriveLimits, SessionDriver};
pub use navigation::{decide, Action};

use crate::gateway::Gateways;
use crate::model::DiscoveryRequest;
use crate::state::RosterDiscoverySession;
use crate::Result;

/// Runs a single discovery session to completion
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sumi_roster::crawler::discover;
/// use sumi_roster::gateway::Gateways;
/// use sumi_roster::testing::MockSite;
/// use sumi_roster::DiscoveryRequest;
///
/// # async fn example() -> sumi_roster::Result<()> {
/// let site = MockSite::new().member_list("https://example.org/", &["Hanako Yamada"]);
/// let request = DiscoveryRequest::new("https://example.org/", "Example Party", 1, 2);
///
/// let session = discover(Gateways::from_single(Arc::new(site)), &request).await?;
/// assert_eq!(session.results().len(), 1);
/// # Ok(())
/// # }
/// ```
pub async fn discover(
    gateways: Gateways,
    request: &DiscoveryRequest,
) -> Result<RosterDiscoverySession> {
    SessionDriver::new(gateways).run(request).await
}
