//! Contact email resolution.
//!
//! Primary path: a directory-service lookup. On a miss or exhausted quota it
//! falls back to guessing from common address patterns against an MX-confirmed
//! mail domain. The guess is never verified by sending mail and is labeled
//! `pattern_guess` with reduced confidence; resolving nothing at all is a
//! valid terminal state.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::model::EmailResolution;

const DEFAULT_DIRECTORY_URL: &str = "https://api.directory.example.com";
const DEFAULT_DOH_URL: &str = "https://dns.google";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup service error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed lookup response: {0}")]
    Parse(String),
}

/// What the directory service said about a person + company pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Match(String),
    NotFound,
    QuotaExceeded,
}

/// Directory lookup boundary.
pub trait DirectoryLookup {
    async fn lookup(&self, name: &str, company: &str) -> Result<LookupOutcome, ResolveError>;
}

/// DNS mail-exchange boundary, used only by the fallback guess path.
pub trait MxResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Option<String>, ResolveError>;
}

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    email: Option<String>,
}

/// HTTP client for the directory lookup service.
pub struct DirectoryClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl DirectoryClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_DIRECTORY_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

impl DirectoryLookup for DirectoryClient {
    async fn lookup(&self, name: &str, company: &str) -> Result<LookupOutcome, ResolveError> {
        let response = self
            .http
            .get(format!("{}/v1/email-finder", self.base_url))
            .query(&[("name", name), ("company", company)])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            402 | 429 => return Ok(LookupOutcome::QuotaExceeded),
            404 => return Ok(LookupOutcome::NotFound),
            _ => {}
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ResolveError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: DirectoryResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Parse(e.to_string()))?;
        Ok(match body.email {
            Some(email) if !email.is_empty() => LookupOutcome::Match(email),
            _ => LookupOutcome::NotFound,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    data: String,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

/// MX lookup over DNS-over-HTTPS (JSON wire format).
pub struct DohClient {
    http: Client,
    base_url: String,
}

impl DohClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_DOH_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { http, base_url }
    }
}

impl Default for DohClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MxResolver for DohClient {
    async fn resolve_mx(&self, domain: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .http
            .get(format!("{}/resolve", self.base_url))
            .query(&[("name", domain), ("type", "MX")])
            .header("accept", "application/dns-json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ResolveError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: DohResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Parse(e.to_string()))?;
        if body.status != 0 {
            return Ok(None);
        }

        // MX record data is "<preference> <exchange>".
        Ok(body.answer.first().and_then(|a| {
            a.data
                .split_whitespace()
                .next_back()
                .map(|host| host.trim_end_matches('.').to_string())
        }))
    }
}

/// Guess the company's mail domain from its display name: drop legal-suffix
/// tokens, keep alphanumerics, append `.com`. The guess is only ever used
/// after MX confirmation.
pub fn mail_domain_candidate(company: &str) -> Option<String> {
    const LEGAL_SUFFIXES: &[&str] = &["inc", "llc", "ltd", "co", "corp", "corporation", "gmbh"];

    let stem: String = company
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| {
            !token.is_empty() && !LEGAL_SUFFIXES.contains(&token.to_lowercase().as_str())
        })
        .collect::<Vec<_>>()
        .join("")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if stem.is_empty() {
        None
    } else {
        Some(format!("{stem}.com"))
    }
}

/// The ordinal set of common address patterns for a name at a domain:
/// `first.last`, `flast`, `first`.
pub fn address_patterns(name: &str, domain: &str) -> Vec<String> {
    let parts: Vec<String> = name
        .split_whitespace()
        .map(|p| {
            p.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => Vec::new(),
        [first] => vec![format!("{first}@{domain}")],
        [first, .., last] => {
            let initial = first.chars().next().unwrap_or_default();
            vec![
                format!("{first}.{last}@{domain}"),
                format!("{initial}{last}@{domain}"),
                format!("{first}@{domain}"),
            ]
        }
    }
}

/// Composes the primary directory path with the guess-and-confirm fallback.
/// Never fails: transport errors degrade to an absent resolution.
pub struct EmailResolver<D: DirectoryLookup, M: MxResolver> {
    directory: D,
    mx: M,
}

impl<D: DirectoryLookup, M: MxResolver> EmailResolver<D, M> {
    pub fn new(directory: D, mx: M) -> Self {
        Self { directory, mx }
    }

    pub async fn resolve(&self, name: &str, company: &str) -> EmailResolution {
        match self.directory.lookup(name, company).await {
            Ok(LookupOutcome::Match(address)) => {
                tracing::info!(%address, "directory lookup matched");
                return EmailResolution::directory(address);
            }
            Ok(LookupOutcome::QuotaExceeded) => {
                tracing::warn!("directory quota exhausted, falling back to pattern guess");
            }
            Ok(LookupOutcome::NotFound) => {
                tracing::debug!(name, company, "directory lookup missed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "directory lookup failed");
            }
        }

        self.guess(name, company).await
    }

    async fn guess(&self, name: &str, company: &str) -> EmailResolution {
        let Some(domain) = mail_domain_candidate(company) else {
            return EmailResolution::absent();
        };

        match self.mx.resolve_mx(&domain).await {
            Ok(Some(exchange)) => {
                tracing::debug!(%domain, %exchange, "mail domain confirmed via MX");
                match address_patterns(name, &domain).into_iter().next() {
                    Some(address) => EmailResolution::pattern_guess(address),
                    None => EmailResolution::absent(),
                }
            }
            Ok(None) => {
                tracing::debug!(%domain, "no MX record, skipping pattern guess");
                EmailResolution::absent()
            }
            Err(e) => {
                tracing::warn!(error = %e, "MX lookup failed");
                EmailResolution::absent()
            }
        }
    }
}
