use tokio_util::sync::CancellationToken;

use crate::browser::{ActionError, ActionExecutor, BrowserSession};
use crate::capture::{capture_profile, DocumentStore};
use crate::email::{DirectoryLookup, EmailResolver, MxResolver};
use crate::error::ScoutError;
use crate::locator::{locate_recruiter, LocatorAbort, LocatorVerdict};
use crate::model::{DiscoveryResult, EmailResolution, JobRef, Outcome, RunSummary};
use crate::sink::ResultSink;

/// Why the remaining queue is being drained without further attempts.
enum Abandon {
    /// The governor sits in its terminal hold.
    RateLimited,
    /// The browser session is unrecoverable for this run.
    Fatal(String),
    /// Cooperative cancellation was observed.
    Cancelled,
}

impl Abandon {
    fn drained_result(&self, job: &JobRef) -> DiscoveryResult {
        let (outcome, reason) = match self {
            Abandon::RateLimited => (
                Outcome::RateLimited,
                "abandoned under sustained rate limiting".to_string(),
            ),
            Abandon::Fatal(cause) => (Outcome::Failed, format!("aborted: {cause}")),
            Abandon::Cancelled => (Outcome::Failed, "cancelled before attempt".to_string()),
        };
        DiscoveryResult {
            job_id: job.job_id.clone(),
            recruiter: None,
            profile: None,
            email: EmailResolution::absent(),
            outcome,
            reason,
        }
    }
}

/// Drives jobs through the full discovery pipeline, strictly one at a time:
/// locate the recruiter, capture the profile, resolve a contact email, emit
/// exactly one result per job in input order.
///
/// The single browser session and the governor window are owned here; nothing
/// else touches them, so no locking exists anywhere in the worker.
pub struct DiscoveryOrchestrator<S, D, L, M, K>
where
    S: BrowserSession,
    D: DocumentStore,
    L: DirectoryLookup,
    M: MxResolver,
    K: ResultSink,
{
    executor: ActionExecutor<S>,
    store: D,
    resolver: EmailResolver<L, M>,
    sink: K,
}

impl<S, D, L, M, K> DiscoveryOrchestrator<S, D, L, M, K>
where
    S: BrowserSession,
    D: DocumentStore,
    L: DirectoryLookup,
    M: MxResolver,
    K: ResultSink,
{
    pub fn new(
        executor: ActionExecutor<S>,
        store: D,
        resolver: EmailResolver<L, M>,
        sink: K,
    ) -> Self {
        Self {
            executor,
            store,
            resolver,
            sink,
        }
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Process the queue to completion. Every input job yields exactly one
    /// emitted result; a fatal error or a terminal governor hold drains the
    /// rest of the queue with explicit outcomes instead of dropping jobs.
    pub async fn run(
        &mut self,
        jobs: Vec<JobRef>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, ScoutError> {
        let mut summary = RunSummary::new();
        let mut abandon: Option<Abandon> = None;

        tracing::info!(run_id = %summary.run_id, jobs = jobs.len(), "discovery run starting");

        for job in &jobs {
            if abandon.is_none() && cancel.is_cancelled() {
                tracing::info!("cancellation observed between jobs");
                abandon = Some(Abandon::Cancelled);
            }
            if abandon.is_none() && self.executor.governor().in_long_hold() {
                tracing::warn!("governor in terminal hold, abandoning remaining queue");
                abandon = Some(Abandon::RateLimited);
            }

            let drained = abandon.as_ref().map(|reason| reason.drained_result(job));
            let result = match drained {
                Some(result) => result,
                None => {
                    let (result, next_abandon) = self.run_job(job, &cancel).await;
                    abandon = next_abandon;
                    result
                }
            };

            tracing::info!(
                job_id = %job.job_id,
                outcome = %result.outcome,
                reason = %result.reason,
                "job finished"
            );
            summary.record(result.outcome);
            self.sink.emit(&result).await?;
        }

        summary.finish();
        tracing::info!(run_id = %summary.run_id, total = summary.total, "discovery run complete");
        Ok(summary)
    }

    /// Run one job through locate → capture → resolve. Returns the result and
    /// an optional abandonment that applies to the rest of the queue.
    async fn run_job(
        &mut self,
        job: &JobRef,
        cancel: &CancellationToken,
    ) -> (DiscoveryResult, Option<Abandon>) {
        let report = match locate_recruiter(&mut self.executor, job, cancel).await {
            Ok(report) => report,
            Err(LocatorAbort::Cancelled) => {
                let abandon = Abandon::Cancelled;
                return (abandon.drained_result(job), Some(abandon));
            }
            Err(LocatorAbort::Action(e)) => return self.aborted_job(job, e),
        };
        tracing::debug!(
            job_id = %job.job_id,
            tiers_walked = report.tiers_walked.len(),
            "locator run complete"
        );

        let company = report.context.company.clone().unwrap_or_default();

        match report.verdict {
            LocatorVerdict::Found(candidate) => {
                let (profile, capture_reason, abandon) =
                    match capture_profile(&mut self.executor, &self.store, &candidate.profile_url)
                        .await
                    {
                        Ok(profile) => (Some(profile), None, None),
                        Err(e) => {
                            tracing::warn!(job_id = %job.job_id, error = %e, "profile capture failed");
                            let abandon = match e.action() {
                                Some(a) if a.is_fatal() => Some(Abandon::Fatal(a.to_string())),
                                Some(ActionError::Throttled { .. }) => Some(Abandon::RateLimited),
                                _ => None,
                            };
                            (None, Some(e.to_string()), abandon)
                        }
                    };

                // The contact sub-path is independent of capture success.
                let email = self
                    .resolver
                    .resolve(&candidate.display_name, &company)
                    .await;

                let (outcome, reason) = match (&profile, capture_reason) {
                    (Some(_), _) => (
                        Outcome::Success,
                        format!("recruiter located via {}", candidate.discovery_strategy),
                    ),
                    (None, Some(cause)) => (Outcome::PartialSuccess, cause),
                    (None, None) => (Outcome::PartialSuccess, "capture skipped".to_string()),
                };

                (
                    DiscoveryResult {
                        job_id: job.job_id.clone(),
                        recruiter: Some(candidate),
                        profile,
                        email,
                        outcome,
                        reason,
                    },
                    abandon,
                )
            }
            LocatorVerdict::Exhausted => {
                // A partial identity still deserves a resolution attempt.
                let email = match &report.context.partial_name {
                    Some(name) => self.resolver.resolve(name, &company).await,
                    None => EmailResolution::absent(),
                };

                (
                    DiscoveryResult {
                        job_id: job.job_id.clone(),
                        recruiter: None,
                        profile: None,
                        email,
                        outcome: Outcome::NotFound,
                        reason: "all locator tiers exhausted".to_string(),
                    },
                    None,
                )
            }
        }
    }

    fn aborted_job(&self, job: &JobRef, error: ActionError) -> (DiscoveryResult, Option<Abandon>) {
        match error {
            ActionError::Throttled { .. } => {
                let result = DiscoveryResult {
                    job_id: job.job_id.clone(),
                    recruiter: None,
                    profile: None,
                    email: EmailResolution::absent(),
                    outcome: Outcome::RateLimited,
                    reason: "abandoned under sustained rate limiting".to_string(),
                };
                (result, Some(Abandon::RateLimited))
            }
            e => {
                let result = DiscoveryResult {
                    job_id: job.job_id.clone(),
                    recruiter: None,
                    profile: None,
                    email: EmailResolution::absent(),
                    outcome: Outcome::Failed,
                    reason: e.to_string(),
                };
                (result, Some(Abandon::Fatal(e.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::executor::Pacing;
    use crate::capture::FsDocumentStore;
    use crate::email::{LookupOutcome, ResolveError};
    use crate::governor::RateGovernor;
    use crate::demo::ScriptedBrowser;
    use crate::model::{DiscoveryStrategy, ResolutionMethod};
    use crate::sink::MemorySink;

    const LADDER: [u64; 3] = [5, 30, 60];

    struct StubDirectory(LookupOutcome);

    impl DirectoryLookup for StubDirectory {
        async fn lookup(&self, _n: &str, _c: &str) -> Result<LookupOutcome, ResolveError> {
            Ok(self.0.clone())
        }
    }

    struct NoMx;

    impl MxResolver for NoMx {
        async fn resolve_mx(&self, _domain: &str) -> Result<Option<String>, ResolveError> {
            Ok(None)
        }
    }

    fn quiet_pacing() -> Pacing {
        Pacing {
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            wait_ceiling: std::time::Duration::from_secs(300),
        }
    }

    fn jobs(n: usize) -> Vec<JobRef> {
        (1..=n)
            .map(|i| JobRef {
                job_id: i.to_string(),
                url: format!("https://jobs.example.com/view/{i}"),
            })
            .collect()
    }

    fn hiring_team_page(site: &mut ScriptedBrowser) {
        site.text_element(
            ".job-details .company-name a",
            Some("https://jobs.example.com/company/acme"),
            "Acme Corp",
        );
        site.element("section.hiring-team", None);
        site.text_element("section.hiring-team .person-card:nth-of-type(1)", None, "");
        site.text_element(
            "section.hiring-team .person-card:nth-of-type(1) .title",
            None,
            "Technical Recruiter",
        );
        site.text_element(
            "section.hiring-team .person-card:nth-of-type(1) .name",
            None,
            "Jane Doe",
        );
        site.element(
            "section.hiring-team .person-card:nth-of-type(1) a",
            Some("https://jobs.example.com/in/jane-doe"),
        );
    }

    fn orchestrator(
        site: ScriptedBrowser,
        ladder: &[u64],
        budget: u32,
        directory: LookupOutcome,
        store_dir: &std::path::Path,
    ) -> DiscoveryOrchestrator<ScriptedBrowser, FsDocumentStore, StubDirectory, NoMx, MemorySink> {
        DiscoveryOrchestrator::new(
            ActionExecutor::new(site, RateGovernor::new(budget, ladder), quiet_pacing()),
            FsDocumentStore::new(store_dir),
            EmailResolver::new(StubDirectory(directory), NoMx),
            MemorySink::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn hiring_team_job_succeeds_with_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let mut site = ScriptedBrowser::new();
        hiring_team_page(&mut site);
        let mut orch = orchestrator(
            site,
            &LADDER,
            1000,
            LookupOutcome::Match("jane@acme.com".into()),
            dir.path(),
        );

        let summary = orch.run(jobs(1), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.succeeded, 1);

        let results = orch.into_sink().results;
        let result = &results[0];
        assert_eq!(result.outcome, Outcome::Success);
        let recruiter = result.recruiter.as_ref().unwrap();
        assert_eq!(recruiter.discovery_strategy, DiscoveryStrategy::HiringTeam);
        assert!(result.profile.is_some());
        assert_eq!(result.email.method, ResolutionMethod::Directory);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_site_yields_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            ScriptedBrowser::new(),
            &LADDER,
            1000,
            LookupOutcome::NotFound,
            dir.path(),
        );

        let summary = orch.run(jobs(1), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.not_found, 1);

        let results = orch.into_sink().results;
        assert_eq!(results[0].outcome, Outcome::NotFound);
        assert!(results[0].recruiter.is_none());
        assert!(results[0].profile.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn render_failure_degrades_to_partial_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut site = ScriptedBrowser::new();
        hiring_team_page(&mut site);
        site.set_render_failure();
        let mut orch = orchestrator(
            site,
            &LADDER,
            1000,
            LookupOutcome::Match("jane@acme.com".into()),
            dir.path(),
        );

        let summary = orch.run(jobs(1), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.partial, 1);

        let results = orch.into_sink().results;
        let result = &results[0];
        assert_eq!(result.outcome, Outcome::PartialSuccess);
        assert!(result.recruiter.is_some());
        assert!(result.profile.is_none());
        // The contact sub-path is independent of the capture failure.
        assert_eq!(result.email.method, ResolutionMethod::Directory);
    }

    #[tokio::test(start_paused = true)]
    async fn one_result_per_job_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(
            ScriptedBrowser::new(),
            &LADDER,
            1000,
            LookupOutcome::NotFound,
            dir.path(),
        );

        let summary = orch.run(jobs(5), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.total, 5);

        let ids: Vec<_> = orch
            .into_sink()
            .results
            .iter()
            .map(|r| r.job_id.clone())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_limit_drains_remaining_queue() {
        let dir = tempfile::tempdir().unwrap();
        let site = ScriptedBrowser::new();
        // Two-rung ladder: the third throttle signal inside job 5 puts the
        // governor into its terminal hold.
        site.fail_after_navigations(4, 429);
        let mut orch = orchestrator(site, &[5, 30], 1000, LookupOutcome::NotFound, dir.path());

        let summary = orch.run(jobs(10), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.rate_limited, 5);

        let results = orch.into_sink().results;
        assert_eq!(results.len(), 10);
        for result in &results[5..] {
            assert_eq!(result.outcome, Outcome::RateLimited);
        }
        // Jobs 1-4 completed normally before the throttling began.
        for result in &results[..4] {
            assert_eq!(result.outcome, Outcome::NotFound);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_jobs_trigger_no_browser_actions() {
        let dir = tempfile::tempdir().unwrap();
        let site = ScriptedBrowser::new();
        site.fail_after_navigations(4, 429);
        let mut orch = orchestrator(site, &[5, 30], 1000, LookupOutcome::NotFound, dir.path());

        orch.run(jobs(10), CancellationToken::new()).await.unwrap();
        // Jobs 1-4 each navigated once; job 5's navigation failed before
        // being recorded; jobs 6-10 never touched the browser.
        assert_eq!(orch.executor.session().navigation_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_session_error_fails_the_rest_of_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let site = ScriptedBrowser::new();
        site.fail_all_with_status(401);
        let mut orch = orchestrator(site, &LADDER, 1000, LookupOutcome::NotFound, dir.path());

        let summary = orch.run(jobs(3), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.failed, 3);

        let results = orch.into_sink().results;
        assert!(results[0].reason.contains("session invalid"));
        assert!(results[1].reason.starts_with("aborted:"));
        assert!(results[2].reason.starts_with("aborted:"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drains_queue_with_explicit_results() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut orch = orchestrator(
            ScriptedBrowser::new(),
            &LADDER,
            1000,
            LookupOutcome::NotFound,
            dir.path(),
        );

        let summary = orch.run(jobs(3), cancel).await.unwrap();
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.total, 3);

        let navigation_count = orch.executor.session().navigation_count();
        let results = orch.into_sink().results;
        assert!(results.iter().all(|r| r.reason.contains("cancelled")));
        assert_eq!(navigation_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_with_partial_identity_still_resolves_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut site = ScriptedBrowser::new();
        site.text_element(
            ".job-details .company-name a",
            Some("https://jobs.example.com/company/acme"),
            "Acme Corp",
        );
        // Recruiter-titled card with no profile link: identity only.
        site.element("section.hiring-team", None);
        site.text_element("section.hiring-team .person-card:nth-of-type(1)", None, "");
        site.text_element(
            "section.hiring-team .person-card:nth-of-type(1) .title",
            None,
            "Talent Partner",
        );
        site.text_element(
            "section.hiring-team .person-card:nth-of-type(1) .name",
            None,
            "Sam Reyes",
        );

        let mut orch = orchestrator(
            site,
            &LADDER,
            1000,
            LookupOutcome::Match("sam@acme.com".into()),
            dir.path(),
        );

        let summary = orch.run(jobs(1), CancellationToken::new()).await.unwrap();
        assert_eq!(summary.not_found, 1);

        let results = orch.into_sink().results;
        let result = &results[0];
        assert_eq!(result.outcome, Outcome::NotFound);
        assert!(result.recruiter.is_none());
        assert_eq!(result.email.address.as_deref(), Some("sam@acme.com"));
    }
}
