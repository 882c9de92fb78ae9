use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Canonical string form of a URL, used for equality and deduplication
///
/// Equality, ordering and hashing all operate on the normalized string only,
/// so two spellings of the same page collapse into one visited-set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Returns the canonical string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Re-parses the canonical string into a `Url`
    pub fn to_url(&self) -> Result<Url, UrlError> {
        Url::parse(&self.0).map_err(|e| UrlError::Parse(e.to_string()))
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a URL according to Sumi-Roster's canonicalization rules
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Parse the URL; reject if malformed or relative
/// 3. Require an HTTP(S) scheme and a host
/// 4. Lowercase scheme and host (the parser already does this for HTTP(S))
/// 5. Strip trailing slashes from the path, unless the path is exactly `/`
/// 6. Remove the fragment
///
/// The query string and path parameters are left untouched.
///
/// # Examples
///
/// ```
/// use sumi_roster::url::normalize;
///
/// let url = normalize("  HTTPS://Example.COM/Members/?page=2#top ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/Members?page=2");
/// ```
pub fn normalize(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Parse(e.to_string()))?;
            }
        }
        _ => return Err(UrlError::MissingHost),
    }

    let path = strip_trailing_slashes(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    Ok(NormalizedUrl(url.to_string()))
}

/// Removes every trailing slash; an emptied path becomes the root
fn strip_trailing_slashes(path: &str) -> String {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}
