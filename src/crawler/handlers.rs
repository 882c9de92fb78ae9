//! Step handlers
//!
//! Each handler wraps one group of gateway calls for the current page and
//! applies the outcome to the session. Gateway failures never escape a
//! handler: they are logged and the session is left as it was.

use crate::gateway::{FetchedPage, Gateways};
use crate::model::{ClassificationContext, Link, PageClassification, RosterMember};
use crate::state::RosterDiscoverySession;
use crate::{GatewayError, GatewayResult};
use crate::url::{
    exclude_url, filter_children, filter_siblings, normalize, same_domain_or_subdomain,
};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Builds the classifier context for the session's current position
pub fn context_for(session: &RosterDiscoverySession) -> ClassificationContext {
    ClassificationContext {
        party_name: session.party_name().to_string(),
        party_id: session.party_id(),
        depth: session.depth(),
        max_depth: session.max_depth(),
    }
}

/// Fetches and classifies a page
///
/// Fetch failures, empty pages and classifier errors all produce the
/// soft-fail classification (`Other`, confidence 0).
pub async fn classify(
    gateways: &Gateways,
    url: &Url,
    context: &ClassificationContext,
) -> PageClassification {
    let page = match fetch_on_site(gateways, url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "Fetch failed during classification");
            return PageClassification::soft_fail(format!("fetch failed: {}", e));
        }
    };

    if page.html.trim().is_empty() {
        warn!(url = %url, "Empty page");
        return PageClassification::soft_fail("empty page");
    }

    match gateways
        .page_classifier
        .classify_page(&page.html, &page.final_url, context)
        .await
    {
        Ok(classification) => classification,
        Err(e) => {
            warn!(url = %url, error = %e, "Page classification failed");
            PageClassification::soft_fail(format!("classification failed: {}", e))
        }
    }
}

/// Classifies the links of the current page and enqueues navigable ones
///
/// Followable links (navigable type at or above `threshold`) are enqueued
/// one level below the current depth, unless already visited or beyond the
/// session's maximum depth. Returns the number of URLs enqueued.
pub async fn explore_children(
    gateways: &Gateways,
    session: &mut RosterDiscoverySession,
    url: &Url,
    context: &ClassificationContext,
    threshold: f64,
) -> usize {
    let page = match fetch_on_site(gateways, url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "Fetch failed, not exploring children");
            return 0;
        }
    };

    let links = match gateways
        .link_extractor
        .extract_links(&page.html, &page.final_url)
    {
        Ok(links) => links,
        Err(e) => {
            warn!(url = %url, error = %e, "Link extraction failed");
            return 0;
        }
    };

    let candidates = rank_candidates(&links, &page.final_url, session);
    if candidates.is_empty() {
        debug!(url = %url, extracted = links.len(), "No candidate links to classify");
        return 0;
    }

    let classifications = match gateways
        .link_classifier
        .classify_links(&candidates, context)
        .await
    {
        Ok(classifications) => classifications,
        Err(e) => {
            warn!(url = %url, error = %e, "Link classification failed");
            return 0;
        }
    };

    let next_depth = session.depth() + 1;
    let mut enqueued = 0;

    for classification in classifications {
        if !classification.is_followable(threshold) {
            debug!(
                link = %classification.url(),
                link_type = %classification.link_type(),
                confidence = classification.confidence(),
                "Not following link"
            );
            continue;
        }

        let normalized = match normalize(classification.url().as_str()) {
            Ok(normalized) => normalized,
            Err(e) => {
                debug!(link = %classification.url(), error = %e, "Unusable link");
                continue;
            }
        };

        if session.is_visited(&normalized) {
            continue;
        }
        if next_depth > session.max_depth() {
            debug!(link = %normalized, depth = next_depth, "Depth limit reached");
            continue;
        }

        if session.enqueue(normalized, next_depth) {
            enqueued += 1;
        }
    }

    debug!(url = %url, candidates = candidates.len(), enqueued, "Explored children");
    enqueued
}

/// Extracts members from the current page and adds them to the roster
///
/// Returns the number of members added. Records without a usable name and
/// names already on the roster are skipped.
pub async fn extract_members(
    gateways: &Gateways,
    session: &mut RosterDiscoverySession,
    url: &Url,
    context: &ClassificationContext,
) -> usize {
    let page = match fetch_on_site(gateways, url).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, error = %e, "Fetch failed, not extracting members");
            return 0;
        }
    };

    let extraction = match gateways
        .member_extractor
        .extract_members(&page.html, &page.final_url, context)
        .await
    {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(url = %url, error = %e, "Member extraction failed");
            return 0;
        }
    };

    if !extraction.success {
        warn!(
            url = %url,
            error = extraction.error.as_deref().unwrap_or("unknown"),
            "Member extraction reported failure"
        );
        return 0;
    }

    let found = extraction.members.len();
    let mut added = 0;
    for raw in extraction.members {
        match RosterMember::try_from(raw) {
            Ok(member) => {
                if session.add_member(member) {
                    added += 1;
                }
            }
            Err(e) => debug!(url = %url, error = %e, "Skipping extracted member"),
        }
    }

    debug!(url = %url, found, added, "Extracted members");
    added
}

/// Fetches a page, treating a redirect off the site as a fetch failure
async fn fetch_on_site(gateways: &Gateways, url: &Url) -> GatewayResult<FetchedPage> {
    let page = gateways.fetcher.fetch_html(url).await?;

    if !same_domain_or_subdomain(&page.final_url, url) {
        return Err(GatewayError::Fetch {
            url: url.to_string(),
            message: format!("redirected off-site to {}", page.final_url),
        });
    }

    Ok(page)
}

/// Selects and orders the links worth sending to the link classifier
///
/// Only links on the same site, other than the page itself and not yet
/// visited, are kept. Hierarchy children come first, then siblings, then
/// everything else, each group in document order.
fn rank_candidates(links: &[Link], current: &Url, session: &RosterDiscoverySession) -> Vec<Link> {
    let on_site: Vec<Link> = exclude_url(links, current)
        .into_iter()
        .filter(|link| same_domain_or_subdomain(&link.url, current))
        .filter(|link| match normalize(link.url.as_str()) {
            Ok(normalized) => !session.is_visited(&normalized),
            Err(_) => false,
        })
        .collect();

    let children = filter_children(&on_site, current);
    let siblings = filter_siblings(&on_site, current);

    let mut seen = HashSet::new();
    children
        .into_iter()
        .chain(siblings)
        .chain(on_site)
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}
