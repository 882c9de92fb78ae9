use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_roster::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether two URLs live on the same site
///
/// Returns true if the hosts are equal (case-insensitive), or if one host is a
/// dot-suffixed subdomain of the other: `tokyo.example.org` and `example.org`
/// match, `badexample.org` and `example.org` do not.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_roster::url::same_domain_or_subdomain;
///
/// let root = Url::parse("https://example.org/").unwrap();
/// let branch = Url::parse("https://Tokyo.Example.org/members").unwrap();
/// let other = Url::parse("https://notexample.org/").unwrap();
///
/// assert!(same_domain_or_subdomain(&root, &branch));
/// assert!(!same_domain_or_subdomain(&root, &other));
/// ```
pub fn same_domain_or_subdomain(a: &Url, b: &Url) -> bool {
    let (Some(host_a), Some(host_b)) = (extract_domain(a), extract_domain(b)) else {
        return false;
    };

    if host_a.is_empty() || host_b.is_empty() {
        return false;
    }

    host_a == host_b || is_subdomain_of(&host_a, &host_b) || is_subdomain_of(&host_b, &host_a)
}

/// True if `candidate` ends with `.base`
fn is_subdomain_of(candidate: &str, base: &str) -> bool {
    candidate
        .strip_suffix(base)
        .map(|prefix| prefix.ends_with('.'))
        .unwrap_or(false)
}
