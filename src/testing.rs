//! Testing utilities including a scripted in-memory site.
//!
//! `MockSite` implements every gateway trait over a fixed set of pages, so
//! discovery can be exercised without network or model calls:
//!
//! ```
//! use std::sync::Arc;
//! use sumi_roster::gateway::Gateways;
//! use sumi_roster::testing::MockSite;
//!
//! let site = Arc::new(
//!     MockSite::new()
//!         .index_page("https://example.org/", &["https://example.org/tokyo"])
//!         .member_list("https://example.org/tokyo", &["Hanako Yamada"]),
//! );
//! let gateways = Gateways::from_single(site.clone());
//! ```
//!
//! Pages are served as real HTML, and link extraction runs the production
//! `HtmlLinkExtractor` over it. Classifications come from the script.

use crate::gateway::{
    FetchedPage, HtmlFetcher, HtmlLinkExtractor, LinkClassifier, LinkExtractor, MemberExtractor,
    PageClassifier,
};
use crate::model::{
    ClassificationContext, ExtractedMember, Link, LinkClassification, LinkType,
    MemberExtraction, PageClassification, PageType,
};
use crate::url::normalize;
use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// Confidence used for scripted verdicts unless overridden
pub const MOCK_CONFIDENCE: f64 = 0.95;

/// How a scripted page responds to fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBehavior {
    /// Always serves the page
    Serve,

    /// Serves an empty body
    Empty,

    /// Serves the page this many times, then fails
    FailAfter(usize),
}

/// One scripted page
#[derive(Debug, Clone)]
pub struct MockPage {
    pub classification: PageClassification,
    pub links: Vec<String>,
    pub members: Vec<ExtractedMember>,

    /// Verdict returned when another page links here
    pub link_type: LinkType,
    pub link_confidence: f64,

    pub fetch: FetchBehavior,

    /// Fail member extraction with this message
    pub extraction_error: Option<String>,

    /// Panic inside page classification
    pub panic_on_classify: bool,
}

impl MockPage {
    pub fn new(classification: PageClassification) -> Self {
        let link_type = match classification.page_type() {
            PageType::IndexPage => LinkType::PrefectureList,
            PageType::MemberListPage => LinkType::MemberList,
            PageType::Other => LinkType::Other,
        };

        Self {
            classification,
            links: Vec::new(),
            members: Vec::new(),
            link_type,
            link_confidence: MOCK_CONFIDENCE,
            fetch: FetchBehavior::Serve,
            extraction_error: None,
            panic_on_classify: false,
        }
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_members(mut self, names: &[&str]) -> Self {
        self.members = names.iter().map(|n| ExtractedMember::named(*n)).collect();
        self
    }

    pub fn with_extracted(mut self, members: Vec<ExtractedMember>) -> Self {
        self.members = members;
        self
    }

    pub fn with_link_verdict(mut self, link_type: LinkType, confidence: f64) -> Self {
        self.link_type = link_type;
        self.link_confidence = confidence;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchBehavior) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_extraction_error(mut self, error: impl Into<String>) -> Self {
        self.extraction_error = Some(error.into());
        self
    }

    fn to_html(&self, url: &str) -> String {
        let mut html = format!(
            "<html><head><title>{0}</title></head><body><h1>{0}</h1>\n<ul>\n",
            escape_html(url)
        );
        for link in &self.links {
            html.push_str(&format!(
                "<li><a href=\"{0}\">{0}</a></li>\n",
                escape_html(link)
            ));
        }
        html.push_str("</ul>\n<ul class=\"members\">\n");
        for member in &self.members {
            if let Some(name) = &member.name {
                html.push_str(&format!("<li>{}</li>\n", escape_html(name)));
            }
        }
        html.push_str("</ul>\n</body></html>\n");
        html
    }
}

/// Record of a call made to the mock site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Fetch { url: String },
    ClassifyPage { url: String },
    ExtractLinks { url: String },
    ClassifyLinks { count: usize },
    ExtractMembers { url: String },
}

/// Scripted site implementing every gateway trait
#[derive(Debug, Default)]
pub struct MockSite {
    pages: HashMap<String, MockPage>,

    /// Redirect targets keyed by the requested URL
    redirects: HashMap<String, String>,
    latency: Option<Duration>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page with an explicit script
    pub fn page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(key(url), page);
        self
    }

    /// Adds a confident index page linking to `children`
    pub fn index_page(self, url: &str, children: &[&str]) -> Self {
        let classification = confident(PageType::IndexPage).with_child_links(true);
        self.page(url, MockPage::new(classification).with_links(children))
    }

    /// Adds a confident member list page listing `names`
    pub fn member_list(self, url: &str, names: &[&str]) -> Self {
        let classification = confident(PageType::MemberListPage).with_member_info(true);
        self.page(url, MockPage::new(classification).with_members(names))
    }

    /// Adds a confident page classified `Other`, linking to `links`
    pub fn other_page(self, url: &str, links: &[&str]) -> Self {
        self.page(url, MockPage::new(confident(PageType::Other)).with_links(links))
    }

    /// Adds a followable page whose every fetch fails
    pub fn failing_fetch(self, url: &str) -> Self {
        let page = MockPage::new(confident(PageType::IndexPage))
            .with_link_verdict(LinkType::CityList, MOCK_CONFIDENCE)
            .with_fetch(FetchBehavior::FailAfter(0));
        self.page(url, page)
    }

    /// Adds a followable index page whose classification panics
    pub fn panicking_page(self, url: &str) -> Self {
        let mut page = MockPage::new(confident(PageType::IndexPage));
        page.panic_on_classify = true;
        self.page(url, page)
    }

    /// Serves `to` whenever `from` is fetched, as an HTTP redirect would
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(key(from), to.to_string());
        self
    }

    /// Delays every fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of fetches made for `url`
    pub fn fetch_count(&self, url: &str) -> usize {
        lock(&self.fetch_counts).get(&key(url)).copied().unwrap_or(0)
    }

    /// Number of `classify_links` calls made
    pub fn classify_links_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, MockCall::ClassifyLinks { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn lookup(&self, url: &Url) -> Option<&MockPage> {
        self.pages.get(&key(url.as_str()))
    }
}

#[async_trait]
impl HtmlFetcher for MockSite {
    async fn fetch_html(&self, url: &Url) -> GatewayResult<FetchedPage> {
        self.record(MockCall::Fetch {
            url: url.to_string(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let fetch_error = |message: &str| GatewayError::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        };

        let final_url = match self.redirects.get(&key(url.as_str())) {
            Some(target) => Url::parse(target).map_err(|_| fetch_error("bad redirect"))?,
            None => url.clone(),
        };
        let page = self
            .lookup(&final_url)
            .ok_or_else(|| fetch_error("not found"))?;

        let previous = {
            let mut counts = lock(&self.fetch_counts);
            let count = counts.entry(key(final_url.as_str())).or_insert(0);
            *count += 1;
            *count - 1
        };

        let html = match page.fetch {
            FetchBehavior::Serve => page.to_html(final_url.as_str()),
            FetchBehavior::Empty => String::new(),
            FetchBehavior::FailAfter(n) if previous < n => page.to_html(final_url.as_str()),
            FetchBehavior::FailAfter(_) => return Err(fetch_error("connection failed")),
        };

        Ok(FetchedPage { final_url, html })
    }
}

#[async_trait]
impl PageClassifier for MockSite {
    async fn classify_page(
        &self,
        _html: &str,
        url: &Url,
        _context: &ClassificationContext,
    ) -> GatewayResult<PageClassification> {
        self.record(MockCall::ClassifyPage {
            url: url.to_string(),
        });

        match self.lookup(url) {
            Some(page) if page.panic_on_classify => {
                panic!("scripted classifier panic for {}", url)
            }
            Some(page) => Ok(page.classification.clone()),
            None => Ok(PageClassification::soft_fail("unknown page")),
        }
    }
}

impl LinkExtractor for MockSite {
    fn extract_links(&self, html: &str, base_url: &Url) -> GatewayResult<Vec<Link>> {
        self.record(MockCall::ExtractLinks {
            url: base_url.to_string(),
        });
        HtmlLinkExtractor::new().extract_links(html, base_url)
    }
}

#[async_trait]
impl LinkClassifier for MockSite {
    async fn classify_links(
        &self,
        links: &[Link],
        _context: &ClassificationContext,
    ) -> GatewayResult<Vec<LinkClassification>> {
        self.record(MockCall::ClassifyLinks { count: links.len() });

        links
            .iter()
            .map(|link| {
                let (link_type, confidence) = match self.lookup(&link.url) {
                    Some(page) => (page.link_type, page.link_confidence),
                    None => (LinkType::Other, 0.0),
                };
                LinkClassification::new(link.url.clone(), link_type, confidence, "scripted")
                    .map_err(|e| GatewayError::Classification(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl MemberExtractor for MockSite {
    async fn extract_members(
        &self,
        _html: &str,
        url: &Url,
        _context: &ClassificationContext,
    ) -> GatewayResult<MemberExtraction> {
        self.record(MockCall::ExtractMembers {
            url: url.to_string(),
        });

        Ok(match self.lookup(url) {
            Some(page) => match &page.extraction_error {
                Some(error) => MemberExtraction::failed(error.clone()),
                None => MemberExtraction::succeeded(page.members.clone()),
            },
            None => MemberExtraction::failed("unknown page"),
        })
    }
}

/// A confident classification of the given type
pub fn confident(page_type: PageType) -> PageClassification {
    PageClassification::new(page_type, MOCK_CONFIDENCE, "scripted")
        .unwrap_or_else(|_| PageClassification::soft_fail("scripted"))
}

fn key(url: &str) -> String {
    normalize(url)
        .map(|u| u.as_str().to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
