use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Result of asking the governor for permission to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Suspend for at least this long, then ask again. The governor never
    /// drops a request.
    MustWait(Duration),
}

/// Sliding-window admission control for every network-visible browser action.
///
/// Tracks an action budget over a rolling one-hour window and layers an
/// escalating hold ladder on top when the target site signals throttling.
/// The ladder walks 5s → 30s → 60s and then enters a terminal hold; the first
/// subsequent success resets it.
pub struct RateGovernor {
    budget: u32,
    window: Duration,
    ladder: Vec<Duration>,
    admitted: VecDeque<Instant>,
    throttle_level: usize,
    hold_until: Option<Instant>,
}

impl RateGovernor {
    pub fn new(budget_per_hour: u32, ladder_secs: &[u64]) -> Self {
        Self {
            budget: budget_per_hour,
            window: Duration::from_secs(3600),
            ladder: ladder_secs.iter().map(|s| Duration::from_secs(*s)).collect(),
            admitted: VecDeque::new(),
            throttle_level: 0,
            hold_until: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Request permission to spend `cost` actions from the window budget.
    pub fn admit(&mut self, cost: u32) -> Admission {
        let now = Instant::now();

        if let Some(hold) = self.hold_until {
            if now < hold {
                return Admission::MustWait(hold - now);
            }
            self.hold_until = None;
        }

        self.evict(now);

        if self.admitted.len() as u32 + cost <= self.budget {
            for _ in 0..cost {
                self.admitted.push_back(now);
            }
            return Admission::Allowed;
        }

        // The wait ends when enough of the oldest entries roll out of the
        // window to free `cost` slots.
        let overflow = self.admitted.len() as u32 + cost - self.budget;
        let frees_at = self
            .admitted
            .get(overflow as usize - 1)
            .map(|t| *t + self.window)
            .unwrap_or(now + self.window);
        Admission::MustWait(frees_at.saturating_duration_since(now))
    }

    /// An external throttling response was observed (anomalous status from the
    /// target site). Shrinks the remaining window budget and advances the
    /// hold ladder.
    pub fn record_rate_limit_signal(&mut self) {
        let now = Instant::now();
        self.evict(now);

        // Shrink the remaining window: half the unspent budget is forfeited,
        // rounded up, so repeated signals drive it to zero.
        let remaining = self.budget.saturating_sub(self.admitted.len() as u32);
        for _ in 0..remaining.div_ceil(2) {
            self.admitted.push_back(now);
        }

        self.throttle_level = (self.throttle_level + 1).min(self.ladder.len() + 1);
        let hold = if self.throttle_level <= self.ladder.len() {
            self.ladder[self.throttle_level - 1]
        } else {
            // Ladder exhausted: hold for the rest of the window.
            self.window
        };
        self.hold_until = Some(now + hold);
    }

    /// First success after a throttling episode resets the ladder.
    pub fn record_success(&mut self) {
        self.throttle_level = 0;
        self.hold_until = None;
    }

    /// True once the ladder is exhausted and the governor sits in its terminal
    /// hold. The orchestrator abandons the remaining queue at this point.
    pub fn in_long_hold(&self) -> bool {
        self.throttle_level > self.ladder.len()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.admitted.front() {
            if now.duration_since(*front) >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
