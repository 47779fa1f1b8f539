//! Profile capture: render a recruiter profile to a document and persist it.
//!
//! `recruiter_id` is derived deterministically from the profile URL's stable
//! path segment, so capturing the same recruiter twice overwrites the stored
//! document instead of duplicating it.

use std::path::PathBuf;

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::browser::{ActionError, ActionExecutor, BrowserSession};
use crate::model::CapturedProfile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable document store boundary. Writes must be idempotent: repeating a
/// `put` under the same key overwrites.
pub trait DocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Filesystem-backed store; the returned storage ref is the file path.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentStore for FsDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path.display().to_string())
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("document render failed: {0}")]
    Render(#[source] ActionError),

    #[error("document store write failed: {0}")]
    Store(#[from] StoreError),
}

impl CaptureError {
    /// The underlying browser error, when the render side failed.
    pub fn action(&self) -> Option<&ActionError> {
        match self {
            CaptureError::Render(e) => Some(e),
            CaptureError::Store(_) => None,
        }
    }
}

/// Derive the stable recruiter id for a profile URL.
///
/// Uses the last non-empty path segment (the profile slug), falling back to
/// the whole URL string when it cannot be parsed. Query strings and fragments
/// never affect the id.
pub fn recruiter_id_from_url(profile_url: &str) -> String {
    let segment = Url::parse(profile_url)
        .ok()
        .and_then(|url| {
            url.path_segments().and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .next_back()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| profile_url.to_string());

    let digest = Sha256::digest(segment.as_bytes());
    hex::encode(&digest[..8])
}

/// Render the profile and hand the bytes to the durable store.
///
/// Once stored, ownership of the document transfers to the store; the worker
/// keeps only the returned reference.
pub async fn capture_profile<S: BrowserSession, D: DocumentStore>(
    exec: &mut ActionExecutor<S>,
    store: &D,
    profile_url: &str,
) -> Result<CapturedProfile, CaptureError> {
    let recruiter_id = recruiter_id_from_url(profile_url);

    let bytes = exec
        .render_document(profile_url)
        .await
        .map_err(CaptureError::Render)?;

    let key = format!("profiles/{recruiter_id}.pdf");
    let document_ref = store.put(&key, &bytes).await?;

    tracing::info!(%recruiter_id, %document_ref, size = bytes.len(), "profile captured");

    Ok(CapturedProfile {
        recruiter_id,
        document_ref,
        captured_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::executor::Pacing;
    use crate::governor::RateGovernor;
    use crate::demo::ScriptedBrowser;

    const LADDER: [u64; 3] = [5, 30, 60];

    fn executor(site: ScriptedBrowser) -> ActionExecutor<ScriptedBrowser> {
        ActionExecutor::new(
            site,
            RateGovernor::new(1000, &LADDER),
            Pacing {
                jitter_min_ms: 0,
                jitter_max_ms: 0,
                wait_ceiling: std::time::Duration::from_secs(300),
            },
        )
    }

    #[test]
    fn recruiter_id_is_deterministic() {
        let a = recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123");
        let b = recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn recruiter_id_ignores_query_and_trailing_slash() {
        let base = recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123");
        let with_query =
            recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123?ref=search");
        let with_slash = recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123/");
        assert_eq!(base, with_query);
        assert_eq!(base, with_slash);
    }

    #[test]
    fn distinct_profiles_get_distinct_ids() {
        let a = recruiter_id_from_url("https://jobs.example.com/in/jane-doe");
        let b = recruiter_id_from_url("https://jobs.example.com/in/john-roe");
        assert_ne!(a, b);
    }

    #[test]
    fn unparseable_url_still_hashes() {
        let id = recruiter_id_from_url("not a url at all");
        assert_eq!(id.len(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn capture_writes_document_under_recruiter_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let mut exec = executor(ScriptedBrowser::new());

        let profile = capture_profile(
            &mut exec,
            &store,
            "https://jobs.example.com/in/jane-doe-123",
        )
        .await
        .unwrap();

        let expected_id = recruiter_id_from_url("https://jobs.example.com/in/jane-doe-123");
        assert_eq!(profile.recruiter_id, expected_id);

        let stored = std::fs::read(
            dir.path()
                .join(format!("profiles/{expected_id}.pdf")),
        )
        .unwrap();
        assert_eq!(stored, b"%PDF-1.7 scripted");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_capture_overwrites_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let url = "https://jobs.example.com/in/jane-doe-123";

        let mut exec = executor(ScriptedBrowser::new());
        let first = capture_profile(&mut exec, &store, url).await.unwrap();
        let second = capture_profile(&mut exec, &store, url).await.unwrap();

        assert_eq!(first.recruiter_id, second.recruiter_id);
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("profiles"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn render_failure_is_reported_with_cause() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let site = ScriptedBrowser::new();
        site.set_render_failure();
        let mut exec = executor(site);

        let err = capture_profile(&mut exec, &store, "https://jobs.example.com/in/jane")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Render(_)));
        // Nothing was written.
        assert!(!dir.path().join("profiles").exists());
    }
}
