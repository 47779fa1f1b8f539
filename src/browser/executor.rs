use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use super::error::ActionError;
use super::session::BrowserSession;
use super::types::{ElementHandle, Selector};
use crate::governor::{Admission, RateGovernor};

/// Pacing knobs for the executor: the humanizing jitter applied after every
/// verb and the longest governor wait it will absorb before surfacing control
/// back to the caller.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub wait_ceiling: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            jitter_min_ms: 1500,
            jitter_max_ms: 4000,
            wait_ceiling: Duration::from_secs(300),
        }
    }
}

/// Issues the four browser verbs against one long-lived session.
///
/// Every verb passes the rate governor before touching the network, retries
/// a transient failure exactly once, reports the outcome back to the governor,
/// and sleeps a randomized human-like delay before returning. The jitter is a
/// behavioral constraint of the target site, not cosmetics.
pub struct ActionExecutor<S: BrowserSession> {
    session: S,
    governor: RateGovernor,
    pacing: Pacing,
}

impl<S: BrowserSession> ActionExecutor<S> {
    pub fn new(session: S, governor: RateGovernor, pacing: Pacing) -> Self {
        Self {
            session,
            governor,
            pacing,
        }
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), ActionError> {
        self.admit().await?;
        let mut result = self.session.navigate(url).await;
        if result.as_ref().is_err_and(ActionError::is_transient) {
            tracing::debug!(url, "navigate failed transiently, retrying once");
            self.admit().await?;
            result = self.session.navigate(url).await;
        }
        self.observe(result.as_ref().err());
        self.pause().await;
        result
    }

    pub async fn locate(
        &mut self,
        selector: &Selector,
    ) -> Result<Option<ElementHandle>, ActionError> {
        self.admit().await?;
        let mut result = self.session.locate(selector).await;
        if result.as_ref().is_err_and(ActionError::is_transient) {
            tracing::debug!(?selector, "locate failed transiently, retrying once");
            self.admit().await?;
            result = self.session.locate(selector).await;
        }
        self.observe(result.as_ref().err());
        self.pause().await;
        result
    }

    pub async fn extract(&mut self, handle: &ElementHandle) -> Result<String, ActionError> {
        self.admit().await?;
        let mut result = self.session.extract(handle).await;
        if result.as_ref().is_err_and(ActionError::is_transient) {
            tracing::debug!(element_id = %handle.element_id, "extract failed transiently, retrying once");
            self.admit().await?;
            result = self.session.extract(handle).await;
        }
        self.observe(result.as_ref().err());
        self.pause().await;
        result
    }

    pub async fn render_document(&mut self, url: &str) -> Result<Vec<u8>, ActionError> {
        self.admit().await?;
        let mut result = self.session.render_document(url).await;
        if result.as_ref().is_err_and(ActionError::is_transient) {
            tracing::debug!(url, "render failed transiently, retrying once");
            self.admit().await?;
            result = self.session.render_document(url).await;
        }
        self.observe(result.as_ref().err());
        self.pause().await;
        result
    }

    /// Suspend until the governor admits one action, or surface `Throttled`
    /// when the wait exceeds the ceiling or the governor sits in its terminal
    /// hold.
    async fn admit(&mut self) -> Result<(), ActionError> {
        loop {
            match self.governor.admit(1) {
                Admission::Allowed => return Ok(()),
                Admission::MustWait(wait) => {
                    if self.governor.in_long_hold() || wait > self.pacing.wait_ceiling {
                        return Err(ActionError::Throttled { wait });
                    }
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "governor wait");
                    sleep(wait).await;
                }
            }
        }
    }

    fn observe(&mut self, error: Option<&ActionError>) {
        match error {
            None => self.governor.record_success(),
            Some(e) if e.is_throttle_signal() => {
                tracing::warn!("target site signaled throttling");
                self.governor.record_rate_limit_signal();
            }
            Some(_) => {}
        }
    }

    async fn pause(&self) {
        let min = self.pacing.jitter_min_ms;
        let max = self.pacing.jitter_max_ms.max(min);
        if max == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(min..=max);
        sleep(Duration::from_millis(ms)).await;
    }
}
