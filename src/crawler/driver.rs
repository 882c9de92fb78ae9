//! Session driver - the discovery state machine
//!
//! The driver runs one session from its seed to termination:
//!
//! ```text
//! Initialize -> PopNext -> Classify -> Decide -> {ExploreChildren | ExtractMembers | Skip} -> PopNext ...
//!                  |
//!                  +-> End (queue empty, step budget used, or deadline passed)
//! ```
//!
//! Every step runs as its own task on a clone of the last good session. A
//! step that errors or panics is discarded and the last good session is
//! returned with its `error` set. A step cut off by the deadline is
//! discarded the same way, so the visited set and pending queue of the
//! returned session always reflect whole steps.

use crate::crawler::handlers;
use crate::crawler::navigation::{decide, Action};
use crate::gateway::Gateways;
use crate::model::{DiscoveryRequest, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_STEP_BUDGET};
use crate::state::{DriverState, RosterDiscoverySession, Termination};
use crate::Result;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn};

/// Per-session limits applied while driving
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveLimits {
    pub step_budget: u32,
    pub confidence_threshold: f64,
    pub deadline: Option<Duration>,
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            deadline: None,
        }
    }
}

impl From<&DiscoveryRequest> for DriveLimits {
    fn from(request: &DiscoveryRequest) -> Self {
        Self {
            step_budget: request.step_budget,
            confidence_threshold: request.confidence_threshold,
            deadline: request.deadline,
        }
    }
}

/// Drives discovery sessions against a set of gateways
#[derive(Clone)]
pub struct SessionDriver {
    gateways: Gateways,
}

impl SessionDriver {
    pub fn new(gateways: Gateways) -> Self {
        Self { gateways }
    }

    /// Runs a fresh session for `request` until it terminates
    ///
    /// Fails only when the request itself is invalid (bad seed URL or
    /// out-of-range threshold). Everything that goes wrong after the session
    /// starts is reported on the returned session instead.
    pub async fn run(&self, request: &DiscoveryRequest) -> Result<RosterDiscoverySession> {
        let seed = request.validated_seed()?;

        info!(
            party_id = request.party_id,
            party_name = %request.party_name,
            seed = %seed,
            max_depth = request.max_depth,
            "Starting roster discovery"
        );

        let session = RosterDiscoverySession::for_request(request, seed);
        log_transition(DriverState::Initialize, DriverState::PopNext);

        Ok(self.drive(session, DriveLimits::from(request)).await)
    }

    /// Continues a previously returned session
    ///
    /// Termination data is cleared first; the visited set, pending queue and
    /// roster carry over unchanged. The step budget counts steps already
    /// taken by the snapshot.
    pub async fn resume(
        &self,
        mut session: RosterDiscoverySession,
        limits: DriveLimits,
    ) -> RosterDiscoverySession {
        info!(
            party_id = session.party_id(),
            visited = session.visited_count(),
            pending = session.pending_count(),
            "Resuming roster discovery"
        );

        session.reopen();
        self.drive(session, limits).await
    }

    async fn drive(
        &self,
        mut session: RosterDiscoverySession,
        limits: DriveLimits,
    ) -> RosterDiscoverySession {
        // A deadline too far out to represent is no deadline at all
        let deadline = limits
            .deadline
            .and_then(|d| Instant::now().checked_add(d));

        let termination = loop {
            if !session.has_pending() {
                break Termination::Exhausted;
            }
            if session.steps_taken() >= limits.step_budget {
                break Termination::StepBudget;
            }
            if deadline.is_some_and(|at| Instant::now() >= at) {
                break Termination::Deadline;
            }

            let mut step = tokio::spawn(advance(
                self.gateways.clone(),
                session.clone(),
                limits.confidence_threshold,
            ));

            let joined = match deadline {
                Some(at) => match timeout_at(at, &mut step).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        step.abort();
                        warn!(party_id = session.party_id(), "Deadline passed mid-step, discarding step");
                        break Termination::Deadline;
                    }
                },
                None => step.await,
            };

            match joined {
                Ok(Ok(next)) => session = next,
                Ok(Err(e)) => return fail(&session, e.to_string()),
                Err(e) => return fail(&session, describe_join_error(&e)),
            }
        };

        log_transition(DriverState::PopNext, DriverState::End);
        session.finish(termination);

        info!(
            party_id = session.party_id(),
            termination = %termination,
            steps = session.steps_taken(),
            visited = session.visited_count(),
            pending = session.pending_count(),
            members = session.results().len(),
            "Roster discovery finished"
        );

        session
    }
}

/// Runs one PopNext -> Classify -> Decide -> action cycle
async fn advance(
    gateways: Gateways,
    mut session: RosterDiscoverySession,
    threshold: f64,
) -> Result<RosterDiscoverySession> {
    let Some(next) = session.pop_next() else {
        trace!("Pending queue held only visited URLs");
        return Ok(session);
    };

    let url = next.url.to_url()?;
    let context = handlers::context_for(&session);

    log_transition(DriverState::PopNext, DriverState::Classify);
    let classification = handlers::classify(&gateways, &url, &context).await;

    log_transition(DriverState::Classify, DriverState::Decide);
    let action = decide(
        &classification,
        session.depth(),
        session.max_depth(),
        session.has_pending(),
        threshold,
    );

    debug!(
        url = %url,
        depth = session.depth(),
        page_type = %classification.page_type(),
        confidence = classification.confidence(),
        action = %action,
        "Decided"
    );

    let state = action.driver_state();
    log_transition(DriverState::Decide, state);

    match action {
        Action::ExploreChildren => {
            handlers::explore_children(&gateways, &mut session, &url, &context, threshold).await;
        }
        Action::ExtractMembers => {
            handlers::extract_members(&gateways, &mut session, &url, &context).await;
        }
        Action::Continue | Action::End => {}
    }

    if state.is_action() {
        log_transition(state, DriverState::PopNext);
    }

    session.record_step();
    Ok(session)
}

fn fail(last_good: &RosterDiscoverySession, error: String) -> RosterDiscoverySession {
    warn!(party_id = last_good.party_id(), error = %error, "Discovery step failed");
    last_good.with_error(error)
}

fn describe_join_error(e: &JoinError) -> String {
    if e.is_panic() {
        format!("discovery step panicked: {}", e)
    } else {
        format!("discovery step cancelled: {}", e)
    }
}

fn log_transition(from: DriverState, to: DriverState) {
    debug_assert!(from.can_transition_to(to), "illegal transition {} -> {}", from, to);
    trace!(from = %from, to = %to, "Driver transition");
}
