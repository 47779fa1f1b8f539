mod state;
pub mod tiers;

pub use state::{
    LocatorMachine, LocatorRun, LocatorState, LocatorTransition, LocatorVerdict, PageContext,
    TierOutcome,
};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::browser::{ActionError, ActionExecutor, BrowserSession};
use crate::model::JobRef;

/// Why a locator run stopped before reaching a verdict.
#[derive(Debug, Error)]
pub enum LocatorAbort {
    /// Governor hold or unrecoverable session error.
    #[error(transparent)]
    Action(ActionError),

    /// Cooperative cancellation observed between tiers.
    #[error("locator run cancelled")]
    Cancelled,
}

/// Everything a completed locator run hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct LocatorReport {
    pub verdict: LocatorVerdict,
    pub tiers_walked: Vec<LocatorState>,
    pub context: PageContext,
}

/// Drive the tier sequence for one job until a candidate is found or every
/// tier is exhausted.
///
/// Soft action failures advance to the next tier exactly like a miss; only a
/// governor hold or a fatal session error aborts the run. Cancellation is
/// checked between state transitions, never mid-action.
pub async fn locate_recruiter<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    job: &JobRef,
    cancel: &CancellationToken,
) -> Result<LocatorReport, LocatorAbort> {
    let mut run = LocatorRun::new();
    // Entry transition out of START; the outcome argument is unused there.
    LocatorMachine::advance(&mut run, TierOutcome::NotFound);

    loop {
        if cancel.is_cancelled() {
            return Err(LocatorAbort::Cancelled);
        }

        let attempt = match run.state {
            LocatorState::TryHiringTeamLink => {
                tiers::try_hiring_team(exec, job, &mut run.context).await
            }
            LocatorState::TryConnectionsLink => {
                tiers::try_connections(exec, &mut run.context).await
            }
            LocatorState::TryCompanyPeoplePage => {
                tiers::try_company_people(exec, &mut run.context).await
            }
            LocatorState::Start | LocatorState::Found | LocatorState::Exhausted => {
                unreachable!("locator driver only executes tier states")
            }
        };

        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() || matches!(e, ActionError::Throttled { .. }) => {
                return Err(LocatorAbort::Action(e));
            }
            Err(e) => {
                // Absence and soft failure advance identically; the page
                // structure does not let us tell them apart reliably.
                tracing::debug!(job_id = %job.job_id, state = %run.state, error = %e, "tier failed softly");
                TierOutcome::Failed
            }
        };

        match LocatorMachine::advance(&mut run, outcome) {
            LocatorTransition::Next(_) => continue,
            LocatorTransition::Complete(verdict) => {
                return Ok(LocatorReport {
                    verdict,
                    tiers_walked: run.history,
                    context: run.context,
                });
            }
        }
    }
}
