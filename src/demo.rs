//! Scripted in-process collaborators and the built-in demonstration run.
//!
//! [`ScriptedBrowser`] models a site as canned selector → element tables,
//! optionally scoped per page URL. The demo command drives the full pipeline
//! against it without a real browser; unit tests across the crate reuse the
//! same harness.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::browser::error::ActionError;
use crate::browser::executor::{ActionExecutor, Pacing};
use crate::browser::session::BrowserSession;
use crate::browser::types::{ElementHandle, Selector};
use crate::capture::{DocumentStore, StoreError};
use crate::config::ScoutConfig;
use crate::email::{DirectoryLookup, EmailResolver, LookupOutcome, MxResolver, ResolveError};
use crate::governor::RateGovernor;
use crate::model::JobRef;
use crate::orchestrator::DiscoveryOrchestrator;
use crate::sink::MemorySink;
use crate::ui::RunProgress;

#[derive(Default)]
struct PageDef {
    css: HashMap<String, ElementHandle>,
    text_links: HashMap<String, ElementHandle>,
}

/// An in-memory browser: selectors resolve to canned handles, handles resolve
/// to canned text, navigations are recorded. Elements registered against a
/// page URL are visible only after navigating there; global elements are
/// visible everywhere.
pub struct ScriptedBrowser {
    global: RefCell<PageDef>,
    pages: RefCell<HashMap<String, PageDef>>,
    texts: RefCell<HashMap<String, String>>,
    current: RefCell<Option<String>>,
    navigations: RefCell<Vec<String>>,
    queries: RefCell<Vec<String>>,
    next_id: Cell<u32>,
    fail_all_status: Cell<Option<u16>>,
    fail_after: Cell<Option<(usize, u16)>>,
    render_fails: Cell<bool>,
    render_payload: RefCell<Vec<u8>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self {
            global: RefCell::new(PageDef::default()),
            pages: RefCell::new(HashMap::new()),
            texts: RefCell::new(HashMap::new()),
            current: RefCell::new(None),
            navigations: RefCell::new(Vec::new()),
            queries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            fail_all_status: Cell::new(None),
            fail_after: Cell::new(None),
            render_fails: Cell::new(false),
            render_payload: RefCell::new(b"%PDF-1.7 scripted".to_vec()),
        }
    }

    fn fresh_id(&self) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        format!("el-{id}")
    }

    fn handle(&self, href: Option<&str>) -> ElementHandle {
        ElementHandle {
            element_id: self.fresh_id(),
            href: href.map(str::to_string),
        }
    }

    /// Register an element visible only on one page.
    pub fn page_element(&mut self, url: &str, selector: &str, href: Option<&str>) -> String {
        let handle = self.handle(href);
        let id = handle.element_id.clone();
        self.pages
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .css
            .insert(selector.to_string(), handle);
        id
    }

    /// Register a page-scoped element with extractable text.
    pub fn page_text_element(
        &mut self,
        url: &str,
        selector: &str,
        href: Option<&str>,
        text: &str,
    ) -> String {
        let id = self.page_element(url, selector, href);
        self.texts.borrow_mut().insert(id.clone(), text.to_string());
        id
    }

    fn scripted_failure(&self) -> Option<ActionError> {
        if let Some((n, status)) = self.fail_after.get() {
            if self.navigations.borrow().len() >= n {
                self.fail_all_status.set(Some(status));
                self.fail_after.set(None);
            }
        }
        self.fail_all_status.get().map(|status| match status {
            401 | 403 => ActionError::SessionInvalid { status },
            _ => ActionError::Http {
                status,
                message: "scripted failure".into(),
            },
        })
    }

    fn find(&self, selector: &Selector) -> (String, Option<ElementHandle>) {
        let current = self.current.borrow();
        let pages = self.pages.borrow();
        let page = current.as_deref().and_then(|url| pages.get(url));
        let global = self.global.borrow();

        match selector {
            Selector::Css(s) => {
                let found = page
                    .and_then(|p| p.css.get(s).cloned())
                    .or_else(|| global.css.get(s).cloned());
                (s.clone(), found)
            }
            Selector::Text(t) => {
                let found = page
                    .and_then(|p| p.text_links.get(t).cloned())
                    .or_else(|| global.text_links.get(t).cloned());
                (t.clone(), found)
            }
        }
    }
}

/// Scripting and instrumentation used by the unit-test suites.
#[allow(dead_code)]
impl ScriptedBrowser {
    /// Register an element visible on every page.
    pub fn element(&mut self, selector: &str, href: Option<&str>) -> String {
        let handle = self.handle(href);
        let id = handle.element_id.clone();
        self.global
            .borrow_mut()
            .css
            .insert(selector.to_string(), handle);
        id
    }

    /// Register a globally visible element with extractable text.
    pub fn text_element(&mut self, selector: &str, href: Option<&str>, text: &str) -> String {
        let id = self.element(selector, href);
        self.texts.borrow_mut().insert(id.clone(), text.to_string());
        id
    }

    /// Register a globally visible text-match link.
    pub fn text_link(&mut self, text: &str, href: &str) {
        let handle = self.handle(Some(href));
        self.global
            .borrow_mut()
            .text_links
            .insert(text.to_string(), handle);
    }

    /// From now on, every verb answers with this HTTP status.
    pub fn fail_all_with_status(&self, status: u16) {
        self.fail_all_status.set(Some(status));
    }

    /// Start failing every verb with `status` once `n` navigations completed.
    pub fn fail_after_navigations(&self, n: usize, status: u16) {
        self.fail_after.set(Some((n, status)));
    }

    pub fn set_render_failure(&self) {
        self.render_fails.set(true);
    }

    pub fn last_navigation(&self) -> Option<String> {
        self.navigations.borrow().last().cloned()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.borrow().len()
    }

    pub fn queried(&self, needle: &str) -> bool {
        self.queries.borrow().iter().any(|q| q.contains(needle))
    }
}

impl Default for ScriptedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserSession for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        self.navigations.borrow_mut().push(url.to_string());
        *self.current.borrow_mut() = Some(url.to_string());
        Ok(())
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<ElementHandle>, ActionError> {
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        let (log, found) = self.find(selector);
        self.queries.borrow_mut().push(log);
        Ok(found)
    }

    async fn extract(&self, handle: &ElementHandle) -> Result<String, ActionError> {
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        Ok(self
            .texts
            .borrow()
            .get(&handle.element_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn render_document(&self, _url: &str) -> Result<Vec<u8>, ActionError> {
        if let Some(err) = self.scripted_failure() {
            return Err(err);
        }
        if self.render_fails.get() {
            return Err(ActionError::Http {
                status: 500,
                message: "render crashed".into(),
            });
        }
        Ok(self.render_payload.borrow().clone())
    }
}

/// In-memory document store for demo runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    documents: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        self.documents
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("mem://{key}"))
    }
}

/// Directory stub with a fixed name → address table.
pub struct StaticDirectory {
    entries: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(n, a)| (n.to_string(), a.to_string()))
                .collect(),
        }
    }
}

impl DirectoryLookup for StaticDirectory {
    async fn lookup(&self, name: &str, _company: &str) -> Result<LookupOutcome, ResolveError> {
        Ok(match self.entries.get(name) {
            Some(address) => LookupOutcome::Match(address.clone()),
            None => LookupOutcome::NotFound,
        })
    }
}

/// MX stub that confirms every domain.
pub struct StaticMx;

impl MxResolver for StaticMx {
    async fn resolve_mx(&self, domain: &str) -> Result<Option<String>, ResolveError> {
        Ok(Some(format!("mail.{domain}")))
    }
}

/// Run the full pipeline against scripted pages: one posting with a hiring
/// team, one with nothing, one with a recruiter card that has no profile link.
pub async fn run_demo() -> anyhow::Result<()> {
    let job1 = "https://jobs.example.com/view/1";
    let job3 = "https://jobs.example.com/view/3";

    let mut site = ScriptedBrowser::new();

    site.page_text_element(
        job1,
        ".job-details .company-name a",
        Some("https://jobs.example.com/company/acme"),
        "Acme Corp",
    );
    site.page_element(job1, "section.hiring-team", None);
    site.page_text_element(job1, "section.hiring-team .person-card:nth-of-type(1)", None, "");
    site.page_text_element(
        job1,
        "section.hiring-team .person-card:nth-of-type(1) .title",
        None,
        "Senior Technical Recruiter",
    );
    site.page_text_element(
        job1,
        "section.hiring-team .person-card:nth-of-type(1) .name",
        None,
        "Jane Doe",
    );
    site.page_element(
        job1,
        "section.hiring-team .person-card:nth-of-type(1) a",
        Some("https://jobs.example.com/in/jane-doe"),
    );

    site.page_text_element(
        job3,
        ".job-details .company-name a",
        Some("https://jobs.example.com/company/acme"),
        "Acme Corp",
    );
    site.page_element(job3, "section.hiring-team", None);
    site.page_text_element(job3, "section.hiring-team .person-card:nth-of-type(1)", None, "");
    site.page_text_element(
        job3,
        "section.hiring-team .person-card:nth-of-type(1) .title",
        None,
        "Talent Partner",
    );
    site.page_text_element(
        job3,
        "section.hiring-team .person-card:nth-of-type(1) .name",
        None,
        "Sam Reyes",
    );

    let jobs = vec![
        JobRef {
            job_id: "1".into(),
            url: job1.into(),
        },
        JobRef {
            job_id: "2".into(),
            url: "https://jobs.example.com/view/2".into(),
        },
        JobRef {
            job_id: "3".into(),
            url: job3.into(),
        },
    ];

    let config = ScoutConfig::default();
    // Short jitter and a roomy budget keep the demonstration snappy.
    let pacing = Pacing {
        jitter_min_ms: 100,
        jitter_max_ms: 300,
        wait_ceiling: std::time::Duration::from_secs(300),
    };
    let executor = ActionExecutor::new(
        site,
        RateGovernor::new(120, &config.backoff_ladder_secs),
        pacing,
    );
    let resolver = EmailResolver::new(
        StaticDirectory::new(&[("Jane Doe", "jane.doe@acme.com")]),
        StaticMx,
    );
    let mut orchestrator =
        DiscoveryOrchestrator::new(executor, MemoryStore::new(), resolver, MemorySink::new());

    let progress = RunProgress::start(jobs.len());
    let summary = orchestrator.run(jobs, CancellationToken::new()).await?;
    progress.finish();

    for result in &orchestrator.into_sink().results {
        progress.print_result(result);
    }
    progress.print_summary(&summary);

    Ok(())
}
