//! Link relationship heuristics
//!
//! Pure predicates deciding whether a link points deeper into the hierarchy
//! below a page (a child), or across to a peer page at the same level (a
//! sibling). Both require the two URLs to live on the same site.

use crate::model::Link;
use crate::url::{normalize, same_domain_or_subdomain};
use url::Url;

/// Path fragments that mark roster or listing pages
///
/// Matched case-insensitively against the link's path when the
/// path-prefix test fails. Includes romanized Japanese terms used by party
/// and assembly sites (giin = legislator, meibo = roster, shibu = branch).
pub const LISTING_KEYWORDS: &[&str] = &[
    "list",
    "member",
    "district",
    "region",
    "city",
    "prefecture",
    "pref",
    "area",
    "branch",
    "chapter",
    "roster",
    "directory",
    "giin",
    "meibo",
    "shibu",
    "senkyoku",
    "todofuken",
];

/// Checks if `link` sits below `parent` in the site hierarchy
///
/// Rules, evaluated in order (first match wins):
/// 1. Both URLs must be on the same domain or a subdomain of each other
/// 2. The link's path segments strictly extend the parent's segments
/// 3. Fallback: the link's path contains a listing keyword
///
/// URLs without a usable host never match.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_roster::url::is_child;
///
/// let parent = Url::parse("https://example.org/about").unwrap();
/// let deeper = Url::parse("https://example.org/about/history").unwrap();
/// let listing = Url::parse("https://example.org/tokyo/members").unwrap();
/// let unrelated = Url::parse("https://example.org/contact").unwrap();
///
/// assert!(is_child(&deeper, &parent));
/// assert!(is_child(&listing, &parent));
/// assert!(!is_child(&unrelated, &parent));
/// ```
pub fn is_child(link: &Url, parent: &Url) -> bool {
    if !same_domain_or_subdomain(link, parent) {
        return false;
    }

    let link_segments = path_segments(link);
    let parent_segments = path_segments(parent);

    if link_segments.len() > parent_segments.len() && link_segments.starts_with(&parent_segments)
    {
        return true;
    }

    contains_listing_keyword(link)
}

/// Checks if `link` is a peer of `reference` at the same hierarchy level
///
/// Siblings share the site and the segment count, and differ either in the
/// query string or in the final path segment. Identical segments and query
/// mean the same page, which is not a sibling.
pub fn is_sibling(link: &Url, reference: &Url) -> bool {
    if !same_domain_or_subdomain(link, reference) {
        return false;
    }

    let link_segments = path_segments(link);
    let reference_segments = path_segments(reference);

    if link_segments.len() != reference_segments.len() {
        return false;
    }

    if link.query() != reference.query() {
        return true;
    }

    link_segments.last() != reference_segments.last()
}

/// Keeps the links that are children of `parent`
pub fn filter_children(links: &[Link], parent: &Url) -> Vec<Link> {
    links
        .iter()
        .filter(|link| is_child(&link.url, parent))
        .cloned()
        .collect()
}

/// Keeps the links that are siblings of `reference`
pub fn filter_siblings(links: &[Link], reference: &Url) -> Vec<Link> {
    links
        .iter()
        .filter(|link| is_sibling(&link.url, reference))
        .cloned()
        .collect()
}

/// Drops every link pointing at `url`
///
/// Comparison uses the normalized form, so `https://a.org/x/` and
/// `https://A.org/x#top` are treated as the same page.
pub fn exclude_url(links: &[Link], url: &Url) -> Vec<Link> {
    let target = comparison_key(url);
    links
        .iter()
        .filter(|link| comparison_key(&link.url) != target)
        .cloned()
        .collect()
}

fn comparison_key(url: &Url) -> String {
    normalize(url.as_str())
        .map(|n| n.as_str().to_string())
        .unwrap_or_else(|_| url.as_str().to_string())
}

/// Non-empty path segments of a URL
fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn contains_listing_keyword(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    LISTING_KEYWORDS.iter().any(|keyword| path.contains(keyword))
}
