//! Error types for browser actions.
//!
//! Defines [`ActionError`] with variants for the failure modes of the browser
//! control surface. Uses `thiserror` to derive `Display` and `Error` from the
//! `#[error(...)]` attributes.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a browser verb.
///
/// Element absence is *not* an error; `locate` reports it as `Ok(None)`.
/// The variants here cover real failures, split along the lines the rest of
/// the worker cares about: transient (retried once locally), throttle
/// (feeds the rate governor), and fatal (aborts the run).
#[derive(Debug, Error)]
pub enum ActionError {
    /// Navigation or verb call timed out at the control surface.
    #[error("browser action timed out")]
    Timeout,

    /// The element handle no longer refers to a live DOM node.
    #[error("stale element handle")]
    StaleElement,

    /// The control surface returned a non-success HTTP status.
    /// 429/999-style statuses are throttle signals from the target site.
    #[error("browser control error (status {status}): {message}")]
    Http { status: u16, message: String },

    /// Underlying network failure (DNS, connection refused).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The governor cannot admit the action within the configured ceiling.
    #[error("rate governor hold, earliest admission in {wait:?}")]
    Throttled { wait: Duration },

    /// The session credential was rejected. Unrecoverable for this run.
    #[error("browser session invalid (status {status})")]
    SessionInvalid { status: u16 },

    /// The control surface answered with a payload we could not interpret.
    #[error("malformed control response: {0}")]
    Protocol(String),
}

impl ActionError {
    /// Worth one local retry: timeouts, stale handles, raw network errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ActionError::Timeout | ActionError::StaleElement | ActionError::Network(_)
        )
    }

    /// An upstream throttling response that must feed the rate governor.
    pub fn is_throttle_signal(&self) -> bool {
        matches!(self, ActionError::Http { status: 429 | 999, .. })
    }

    /// Unrecoverable for the whole run, not just this job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::SessionInvalid { .. })
    }
}
