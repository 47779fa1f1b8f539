use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::RecruiterCandidate;

/// The states of the recruiter locator state machine.
///
/// Each job flows through:
/// START → TRY_HIRING_TEAM_LINK → TRY_CONNECTIONS_LINK →
/// TRY_COMPANY_PEOPLE_PAGE → FOUND | EXHAUSTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorState {
    Start,
    TryHiringTeamLink,
    TryConnectionsLink,
    TryCompanyPeoplePage,
    Found,
    Exhausted,
}

impl fmt::Display for LocatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorState::Start => write!(f, "START"),
            LocatorState::TryHiringTeamLink => write!(f, "TRY_HIRING_TEAM_LINK"),
            LocatorState::TryConnectionsLink => write!(f, "TRY_CONNECTIONS_LINK"),
            LocatorState::TryCompanyPeoplePage => write!(f, "TRY_COMPANY_PEOPLE_PAGE"),
            LocatorState::Found => write!(f, "FOUND"),
            LocatorState::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// What a single tier attempt produced.
///
/// `NotFound` and `Failed` advance the machine identically: the page structure
/// does not let us reliably distinguish absence from breakage, so the two are
/// kept symmetric.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Found(RecruiterCandidate),
    NotFound,
    Failed,
}

/// Terminal verdict of a locator run.
#[derive(Debug, Clone, PartialEq)]
pub enum LocatorVerdict {
    Found(RecruiterCandidate),
    Exhausted,
}

/// The result of evaluating a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum LocatorTransition {
    /// Advance to the next tier.
    Next(LocatorState),
    /// The run has reached FOUND or EXHAUSTED.
    Complete(LocatorVerdict),
}

/// Page context accumulated while walking the tiers.
///
/// Survives past `Exhausted` so the orchestrator can still attempt email
/// resolution from a partial identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContext {
    /// Company display name extracted from the job posting.
    pub company: Option<String>,
    /// Company page URL extracted from the job posting.
    pub company_url: Option<String>,
    /// A recruiter-titled card name seen without a usable profile link.
    pub partial_name: Option<String>,
}

/// One locator run over a single job posting.
#[derive(Debug, Clone)]
pub struct LocatorRun {
    pub state: LocatorState,
    pub history: Vec<LocatorState>,
    pub context: PageContext,
}

impl LocatorRun {
    pub fn new() -> Self {
        Self {
            state: LocatorState::Start,
            history: Vec::new(),
            context: PageContext::default(),
        }
    }
}

impl Default for LocatorRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a [`LocatorRun`] through the tier sequence.
pub struct LocatorMachine;

impl LocatorMachine {
    /// Compute and apply the next transition for the given run.
    ///
    /// - `Start` unconditionally enters the first tier (the outcome argument
    ///   is ignored there).
    /// - Each tier is attempted exactly once: `Found` completes the run,
    ///   anything else advances to the next tier.
    /// - The last tier completes with `Exhausted` on a miss; `Exhausted` is a
    ///   terminal verdict, not an error.
    pub fn advance(run: &mut LocatorRun, outcome: TierOutcome) -> LocatorTransition {
        let transition = match run.state {
            LocatorState::Start => LocatorTransition::Next(LocatorState::TryHiringTeamLink),
            LocatorState::TryHiringTeamLink => {
                Self::step(outcome, LocatorState::TryConnectionsLink)
            }
            LocatorState::TryConnectionsLink => {
                Self::step(outcome, LocatorState::TryCompanyPeoplePage)
            }
            LocatorState::TryCompanyPeoplePage => match outcome {
                TierOutcome::Found(candidate) => {
                    LocatorTransition::Complete(LocatorVerdict::Found(candidate))
                }
                TierOutcome::NotFound | TierOutcome::Failed => {
                    LocatorTransition::Complete(LocatorVerdict::Exhausted)
                }
            },
            LocatorState::Found | LocatorState::Exhausted => {
                // Terminal states stay put; the driver never re-enters them.
                return LocatorTransition::Next(run.state);
            }
        };

        match &transition {
            LocatorTransition::Next(next) => {
                run.history.push(run.state);
                run.state = *next;
            }
            LocatorTransition::Complete(verdict) => {
                run.history.push(run.state);
                run.state = match verdict {
                    LocatorVerdict::Found(_) => LocatorState::Found,
                    LocatorVerdict::Exhausted => LocatorState::Exhausted,
                };
            }
        }

        transition
    }

    fn step(outcome: TierOutcome, next: LocatorState) -> LocatorTransition {
        match outcome {
            TierOutcome::Found(candidate) => {
                LocatorTransition::Complete(LocatorVerdict::Found(candidate))
            }
            TierOutcome::NotFound | TierOutcome::Failed => LocatorTransition::Next(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscoveryStrategy;

    fn candidate(strategy: DiscoveryStrategy) -> RecruiterCandidate {
        RecruiterCandidate {
            profile_url: "https://jobs.example.com/in/jane-doe".into(),
            display_name: "Jane Doe".into(),
            title_text: "Technical Recruiter".into(),
            discovery_strategy: strategy,
        }
    }

    #[test]
    fn start_enters_first_tier_unconditionally() {
        let mut run = LocatorRun::new();
        let t = LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        assert_eq!(t, LocatorTransition::Next(LocatorState::TryHiringTeamLink));
        assert_eq!(run.state, LocatorState::TryHiringTeamLink);
    }

    #[test]
    fn first_tier_found_short_circuits() {
        let mut run = LocatorRun::new();
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);

        let c = candidate(DiscoveryStrategy::HiringTeam);
        let t = LocatorMachine::advance(&mut run, TierOutcome::Found(c.clone()));
        assert_eq!(t, LocatorTransition::Complete(LocatorVerdict::Found(c)));
        assert_eq!(run.state, LocatorState::Found);
        // No later tier was ever entered.
        assert_eq!(
            run.history,
            vec![LocatorState::Start, LocatorState::TryHiringTeamLink]
        );
    }

    #[test]
    fn misses_walk_every_tier_then_exhaust() {
        let mut run = LocatorRun::new();
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);

        let t = LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        assert_eq!(t, LocatorTransition::Next(LocatorState::TryConnectionsLink));

        // A soft failure advances exactly like a miss.
        let t = LocatorMachine::advance(&mut run, TierOutcome::Failed);
        assert_eq!(t, LocatorTransition::Next(LocatorState::TryCompanyPeoplePage));

        let t = LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        assert_eq!(t, LocatorTransition::Complete(LocatorVerdict::Exhausted));
        assert_eq!(run.state, LocatorState::Exhausted);
        assert_eq!(
            run.history,
            vec![
                LocatorState::Start,
                LocatorState::TryHiringTeamLink,
                LocatorState::TryConnectionsLink,
                LocatorState::TryCompanyPeoplePage,
            ]
        );
    }

    #[test]
    fn last_tier_can_still_find() {
        let mut run = LocatorRun::new();
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);

        let c = candidate(DiscoveryStrategy::CompanyPeople);
        let t = LocatorMachine::advance(&mut run, TierOutcome::Found(c.clone()));
        assert_eq!(t, LocatorTransition::Complete(LocatorVerdict::Found(c)));
        assert_eq!(run.state, LocatorState::Found);
    }

    #[test]
    fn terminal_state_stays_put() {
        let mut run = LocatorRun::new();
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        assert_eq!(run.state, LocatorState::Exhausted);

        let history_len = run.history.len();
        let t = LocatorMachine::advance(&mut run, TierOutcome::NotFound);
        assert_eq!(t, LocatorTransition::Next(LocatorState::Exhausted));
        assert_eq!(run.state, LocatorState::Exhausted);
        assert_eq!(run.history.len(), history_len);
    }

    #[test]
    fn state_display() {
        assert_eq!(LocatorState::Start.to_string(), "START");
        assert_eq!(
            LocatorState::TryHiringTeamLink.to_string(),
            "TRY_HIRING_TEAM_LINK"
        );
        assert_eq!(
            LocatorState::TryCompanyPeoplePage.to_string(),
            "TRY_COMPANY_PEOPLE_PAGE"
        );
        assert_eq!(LocatorState::Exhausted.to_string(), "EXHAUSTED");
    }
}
