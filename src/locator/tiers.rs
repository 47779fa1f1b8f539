//! The three discovery tiers.
//!
//! Each tier is attempted exactly once per job and reports a tagged
//! [`TierOutcome`]. Errors propagate with `?`; the driver decides whether an
//! error aborts the run (fatal, governor hold) or advances to the next tier
//! (everything else).

use crate::browser::{ActionError, ActionExecutor, BrowserSession, Selector};
use crate::model::{DiscoveryStrategy, JobRef, RecruiterCandidate};

use super::state::{PageContext, TierOutcome};

/// Title substrings that mark a person card as a recruiting contact.
const TITLE_KEYWORDS: &[&str] = &["recruit", "talent"];

/// How many person cards a tier inspects before giving up on a listing.
const MAX_CARDS: usize = 8;

pub fn title_matches(title: &str) -> bool {
    let lower = title.to_lowercase();
    TITLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Tier 1: the job posting's "meet the hiring team" section.
pub async fn try_hiring_team<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    job: &JobRef,
    ctx: &mut PageContext,
) -> Result<TierOutcome, ActionError> {
    exec.navigate(&job.url).await?;

    // Company context is enrichment for later tiers and the email fallback;
    // a miss here must not fail the tier.
    if let Ok(Some(company)) = exec.locate(&Selector::css(".job-details .company-name a")).await {
        if ctx.company_url.is_none() {
            ctx.company_url = company.href.clone();
        }
        if ctx.company.is_none() {
            if let Ok(text) = exec.extract(&company).await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    ctx.company = Some(text);
                }
            }
        }
    }

    let section = exec.locate(&Selector::css("section.hiring-team")).await?;
    if section.is_none() {
        return Ok(TierOutcome::NotFound);
    }

    scan_cards(exec, "section.hiring-team", DiscoveryStrategy::HiringTeam, ctx).await
}

/// Tier 2: a "see connections" affordance on the job posting.
pub async fn try_connections<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    ctx: &mut PageContext,
) -> Result<TierOutcome, ActionError> {
    let Some(link) = exec.locate(&Selector::text("See connections")).await? else {
        return Ok(TierOutcome::NotFound);
    };
    let Some(href) = link.href else {
        return Ok(TierOutcome::NotFound);
    };

    exec.navigate(&href).await?;
    scan_cards(exec, ".connections-list", DiscoveryStrategy::Connections, ctx).await
}

/// Tier 3: the company page's people listing, filtered by title keyword.
pub async fn try_company_people<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    ctx: &mut PageContext,
) -> Result<TierOutcome, ActionError> {
    let company_url = match ctx.company_url.clone() {
        Some(url) => url,
        // Tier 1 may have failed before reading the company link; try once
        // from whatever page we are on.
        None => match exec.locate(&Selector::css(".job-details .company-name a")).await? {
            Some(handle) => match handle.href {
                Some(href) => href,
                None => return Ok(TierOutcome::NotFound),
            },
            None => return Ok(TierOutcome::NotFound),
        },
    };

    let people_url = format!("{}/people", company_url.trim_end_matches('/'));
    exec.navigate(&people_url).await?;
    scan_cards(exec, ".org-people", DiscoveryStrategy::CompanyPeople, ctx).await
}

/// Walk the person cards under `container` in document order and return the
/// first recruiting-titled one with a usable profile link.
///
/// A recruiting-titled card without a link still leaves its name in the
/// context as a partial identity for the email fallback.
async fn scan_cards<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    container: &str,
    strategy: DiscoveryStrategy,
    ctx: &mut PageContext,
) -> Result<TierOutcome, ActionError> {
    for i in 1..=MAX_CARDS {
        let card = format!("{container} .person-card:nth-of-type({i})");
        if exec.locate(&Selector::css(card.clone())).await?.is_none() {
            break;
        }

        let title = match read_text(exec, &format!("{card} .title")).await? {
            Some(t) => t,
            None => continue,
        };
        if !title_matches(&title) {
            continue;
        }

        let name = read_text(exec, &format!("{card} .name")).await?;
        let link = exec
            .locate(&Selector::css(format!("{card} a")))
            .await?
            .and_then(|h| h.href);

        match (name, link) {
            (Some(name), Some(profile_url)) => {
                tracing::info!(%profile_url, strategy = %strategy, "recruiter candidate located");
                return Ok(TierOutcome::Found(RecruiterCandidate {
                    profile_url,
                    display_name: name,
                    title_text: title,
                    discovery_strategy: strategy,
                }));
            }
            (Some(name), None) => {
                // Identity without a profile link: keep it for the resolver.
                ctx.partial_name.get_or_insert(name);
            }
            _ => {}
        }
    }

    Ok(TierOutcome::NotFound)
}

async fn read_text<S: BrowserSession>(
    exec: &mut ActionExecutor<S>,
    selector: &str,
) -> Result<Option<String>, ActionError> {
    match exec.locate(&Selector::css(selector)).await? {
        Some(handle) => {
            let text = exec.extract(&handle).await?;
            let text = text.trim().to_string();
            Ok(if text.is_empty() { None } else { Some(text) })
        }
        None => Ok(None),
    }
}
