//! Worker configuration loaded from `talentscout.toml`.
//!
//! [`ScoutConfig`] holds every tunable the worker recognizes. Values absent
//! from the file fall back to sensible defaults. The `TALENTSCOUT_SESSION_TOKEN`
//! environment variable takes precedence over the file for the credential.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::browser::executor::Pacing;
use crate::governor::RateGovernor;

/// An opaque credential held only in memory for the lifetime of the worker.
///
/// `Debug` redacts so the value can never leak through logs, error records,
/// or result payloads. There is deliberately no `Display` impl.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Top-level configuration loaded from `talentscout.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoutConfig {
    /// Opaque job-site session credential, supplied once at worker start.
    #[serde(default)]
    pub session_token: Secret,

    /// Browser-action budget per rolling hour.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_hour: u32,

    /// Lower bound of the post-action jitter, in milliseconds.
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// Upper bound of the post-action jitter, in milliseconds.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Escalating hold durations applied on throttle signals, in seconds.
    #[serde(default = "default_backoff_ladder")]
    pub backoff_ladder_secs: Vec<u64>,

    /// Longest governor wait absorbed before control returns to the
    /// orchestrator, in seconds.
    #[serde(default = "default_wait_ceiling")]
    pub wait_ceiling_secs: u64,

    /// Browser control endpoint override.
    #[serde(default)]
    pub browser_control_url: Option<String>,

    /// Directory lookup service API key.
    #[serde(default)]
    pub directory_api_key: String,

    /// Directory lookup service endpoint override.
    #[serde(default)]
    pub directory_base_url: Option<String>,

    /// DNS-over-HTTPS endpoint override for the MX fallback.
    #[serde(default)]
    pub doh_base_url: Option<String>,

    /// Directory where captured profile documents are stored.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

// Default budget: 15 profile-fetch-equivalent actions per hour.
fn default_rate_limit() -> u32 {
    15
}

fn default_jitter_min_ms() -> u64 {
    1500
}

fn default_jitter_max_ms() -> u64 {
    4000
}

// Default hold ladder: 5s, 30s, 60s, then terminal hold.
fn default_backoff_ladder() -> Vec<u64> {
    vec![5, 30, 60]
}

fn default_wait_ceiling() -> u64 {
    300
}

fn default_store_dir() -> String {
    "captures".to_string()
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            session_token: Secret::default(),
            rate_limit_per_hour: default_rate_limit(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            backoff_ladder_secs: default_backoff_ladder(),
            wait_ceiling_secs: default_wait_ceiling(),
            browser_control_url: None,
            directory_api_key: String::new(),
            directory_base_url: None,
            doh_base_url: None,
            store_dir: default_store_dir(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from `talentscout.toml` in the current directory,
    /// falling back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new("talentscout.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ScoutConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment takes precedence over the file for the credential.
        if let Ok(token) = std::env::var("TALENTSCOUT_SESSION_TOKEN")
            && !token.is_empty()
        {
            config.session_token = Secret::new(token);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jitter_min_ms > self.jitter_max_ms {
            bail!(
                "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
                self.jitter_min_ms,
                self.jitter_max_ms
            );
        }
        if self.rate_limit_per_hour == 0 {
            bail!("rate_limit_per_hour must be positive");
        }
        if self.backoff_ladder_secs.is_empty() {
            bail!("backoff_ladder_secs must not be empty");
        }
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            jitter_min_ms: self.jitter_min_ms,
            jitter_max_ms: self.jitter_max_ms,
            wait_ceiling: Duration::from_secs(self.wait_ceiling_secs),
        }
    }

    pub fn governor(&self) -> RateGovernor {
        RateGovernor::new(self.rate_limit_per_hour, &self.backoff_ladder_secs)
    }
}
