use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job posting handed down by the upstream search step.
///
/// Consumed read-only by the worker; one [`DiscoveryResult`] is produced for
/// each `JobRef`, never more, never fewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: String,
    pub url: String,
}

/// Which fallback tier produced a recruiter candidate.
///
/// Every candidate carries this provenance so downstream consumers can audit
/// how a contact was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    HiringTeam,
    Connections,
    CompanyPeople,
}

impl std::fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryStrategy::HiringTeam => write!(f, "hiring_team"),
            DiscoveryStrategy::Connections => write!(f, "connections"),
            DiscoveryStrategy::CompanyPeople => write!(f, "company_people"),
        }
    }
}

/// A profile reference believed to belong to the hiring contact for a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterCandidate {
    pub profile_url: String,
    pub display_name: String,
    pub title_text: String,
    pub discovery_strategy: DiscoveryStrategy,
}

/// A persisted snapshot of a recruiter's public profile.
///
/// `recruiter_id` is derived deterministically from the profile URL, so
/// repeated captures of the same recruiter overwrite rather than duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedProfile {
    pub recruiter_id: String,
    pub document_ref: String,
    pub captured_at: DateTime<Utc>,
}

/// How a contact email was obtained, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// A directory-service match.
    Directory,
    /// An unverified guess from common address patterns and an MX-confirmed
    /// domain. Must be labeled as such downstream.
    PatternGuess,
    /// No address could be resolved.
    None,
}

/// Outcome of the email-resolution sub-path. Absence of an address is a valid
/// terminal state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailResolution {
    pub address: Option<String>,
    pub method: ResolutionMethod,
    pub confidence: f32,
}

impl EmailResolution {
    pub fn directory(address: String) -> Self {
        Self {
            address: Some(address),
            method: ResolutionMethod::Directory,
            confidence: 0.9,
        }
    }

    pub fn pattern_guess(address: String) -> Self {
        Self {
            address: Some(address),
            method: ResolutionMethod::PatternGuess,
            confidence: 0.3,
        }
    }

    pub fn absent() -> Self {
        Self {
            address: None,
            method: ResolutionMethod::None,
            confidence: 0.0,
        }
    }
}

/// Terminal classification of a single job's discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Recruiter located, profile captured.
    Success,
    /// Recruiter located but the profile capture failed.
    PartialSuccess,
    /// Every locator tier came up empty. Expected, not an error.
    NotFound,
    /// Abandoned under governor backpressure without being attempted.
    RateLimited,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::PartialSuccess => write!(f, "partial_success"),
            Outcome::NotFound => write!(f, "not_found"),
            Outcome::RateLimited => write!(f, "rate_limited"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// The single artifact crossing the worker's output boundary. Exactly one is
/// emitted per input [`JobRef`], in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub job_id: String,
    pub recruiter: Option<RecruiterCandidate>,
    pub profile: Option<CapturedProfile>,
    pub email: EmailResolution,
    pub outcome: Outcome,
    pub reason: String,
}

/// Aggregate audit record for a whole run, printed when the queue drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub total: u32,
    pub succeeded: u32,
    pub partial: u32,
    pub not_found: u32,
    pub rate_limited: u32,
    pub failed: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            total: 0,
            succeeded: 0,
            partial: 0,
            not_found: 0,
            rate_limited: 0,
            failed: 0,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::PartialSuccess => self.partial += 1,
            Outcome::NotFound => self.not_found += 1,
            Outcome::RateLimited => self.rate_limited += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn finish(&mut self) {
        let now = Utc::now();
        self.duration_ms = (now - self.started_at).num_milliseconds();
        self.completed_at = Some(now);
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
