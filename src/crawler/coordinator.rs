//! Multi-session coordinator
//!
//! Runs one discovery session per organization. Sessions share nothing but
//! the immutable gateway handles, so they run as independent tasks with the
//! number in flight bounded by a semaphore. Finished sessions are handed to
//! the output sinks from the coordinator's own task, one at a time.

use crate::crawler::driver::{DriveLimits, SessionDriver};
use crate::gateway::Gateways;
use crate::model::DiscoveryRequest;
use crate::output::OutputHandler;
use crate::state::RosterDiscoverySession;
use crate::{Result, RosterError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One unit of work for the coordinator
#[derive(Debug, Clone)]
pub enum SessionJob {
    /// Start a new session from a request
    Start(DiscoveryRequest),

    /// Continue a snapshot
    Resume {
        session: RosterDiscoverySession,
        limits: DriveLimits,
    },
}

impl SessionJob {
    pub fn party_id(&self) -> i64 {
        match self {
            Self::Start(request) => request.party_id,
            Self::Resume { session, .. } => session.party_id(),
        }
    }

    pub fn party_name(&self) -> &str {
        match self {
            Self::Start(request) => &request.party_name,
            Self::Resume { session, .. } => session.party_name(),
        }
    }

    /// The session to report when driving this job dies unexpectedly
    fn last_known_session(&self) -> RosterDiscoverySession {
        match self {
            Self::Start(request) => match request.validated_seed() {
                Ok(seed) => RosterDiscoverySession::for_request(request, seed),
                Err(_) => RosterDiscoverySession::new(
                    &request.party_name,
                    request.party_id,
                    request.max_depth,
                ),
            },
            Self::Resume { session, .. } => session.clone(),
        }
    }
}

/// A job that never produced a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedJob {
    pub party_id: i64,
    pub party_name: String,
    pub reason: String,
}

/// Everything a coordinator run produced
#[derive(Debug, Default)]
pub struct CoordinatorReport {
    /// Finished sessions, ordered by party id
    pub sessions: Vec<RosterDiscoverySession>,

    /// Jobs rejected before a session could start
    pub rejected: Vec<RejectedJob>,
}

/// Runs many discovery sessions concurrently
pub struct Coordinator {
    driver: SessionDriver,
    permits: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator running at most `max_concurrent` sessions at once
    pub fn new(gateways: Gateways, max_concurrent: usize) -> Self {
        Self {
            driver: SessionDriver::new(gateways),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Runs every job to completion, feeding finished sessions to `sinks`
    ///
    /// A rejected job (invalid seed URL) is reported and does not affect the
    /// others. Sink errors abort the run.
    pub async fn run_all(
        &self,
        jobs: Vec<SessionJob>,
        sinks: &mut [Box<dyn OutputHandler>],
    ) -> Result<CoordinatorReport> {
        tracing::info!(jobs = jobs.len(), "Starting coordinator");

        let mut tasks = JoinSet::new();
        let mut outstanding: Vec<(i64, String)> = Vec::with_capacity(jobs.len());

        for job in jobs {
            let driver = self.driver.clone();
            let permits = self.permits.clone();
            outstanding.push((job.party_id(), job.party_name().to_string()));

            tasks.spawn(async move {
                let party_id = job.party_id();
                let party_name = job.party_name().to_string();

                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => run_guarded(driver, job).await,
                    Err(e) => Err(RosterError::Driver(format!("coordinator closed: {}", e))),
                };

                (party_id, party_name, outcome)
            });
        }

        let mut report = CoordinatorReport::default();

        while let Some(joined) = tasks.join_next().await {
            let (party_id, party_name, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Session task failed");
                    continue;
                }
            };

            if let Some(pos) = outstanding.iter().position(|(id, _)| *id == party_id) {
                outstanding.remove(pos);
            }

            match outcome {
                Ok(session) => {
                    for sink in sinks.iter_mut() {
                        sink.record_session(&session)?;
                    }
                    report.sessions.push(session);
                }
                Err(e) => {
                    tracing::error!(party_id, party_name = %party_name, error = %e, "Discovery rejected");
                    report.rejected.push(RejectedJob {
                        party_id,
                        party_name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Jobs whose task died before reporting back
        for (party_id, party_name) in outstanding {
            tracing::error!(party_id, party_name = %party_name, "Session lost");
            report.rejected.push(RejectedJob {
                party_id,
                party_name,
                reason: "session task failed".to_string(),
            });
        }

        for sink in sinks.iter_mut() {
            sink.finalize()?;
        }

        report.sessions.sort_by_key(|s| s.party_id());
        report.rejected.sort_by_key(|r| r.party_id);

        tracing::info!(
            sessions = report.sessions.len(),
            rejected = report.rejected.len(),
            "Coordinator finished"
        );

        Ok(report)
    }
}

/// Runs a job on its own task so a panic anywhere in the session still
/// produces a session, carrying the panic as its error
async fn run_guarded(driver: SessionDriver, job: SessionJob) -> Result<RosterDiscoverySession> {
    let last_known = job.last_known_session();

    match tokio::spawn(async move { run_job(&driver, job).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(party_id = last_known.party_id(), error = %e, "Discovery session died");
            Ok(last_known.with_error(format!("discovery session panicked: {}", e)))
        }
    }
}

async fn run_job(driver: &SessionDriver, job: SessionJob) -> Result<RosterDiscoverySession> {
    match job {
        SessionJob::Start(request) => driver.run(&request).await,
        SessionJob::Resume { session, limits } => Ok(driver.resume(session, limits).await),
    }
}
