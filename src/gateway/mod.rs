//! Collaborator interfaces consumed by the discovery engine
//!
//! The engine never talks to the network or to a model directly. It goes
//! through five narrow traits:
//! - `HtmlFetcher`: page download
//! - `PageClassifier`: what kind of page is this?
//! - `LinkExtractor`: which links does it contain?
//! - `LinkClassifier`: which of those links lead towards a roster?
//! - `MemberExtractor`: who is listed on this page?
//!
//! Production implementations live in the submodules; `crate::testing`
//! provides an in-memory scripted site.

mod fetcher;
mod links;
mod llm;
mod prompts;

pub use fetcher::{build_http_client, HttpFetcher};
pub use links::HtmlLinkExtractor;
pub use llm::{LlmGateway, DEFAULT_BASE_URL, DEFAULT_MAX_PAGE_CHARS};

use crate::model::{
    ClassificationContext, Link, LinkClassification, MemberExtraction, PageClassification,
};
use crate::GatewayResult;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// A downloaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL the body was served from, after any redirects
    pub final_url: Url,
    pub html: String,
}

/// Downloads the HTML of a page
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    /// Fails with `GatewayError::Fetch` on network, status or decoding failure
    ///
    /// Relative links in the returned HTML resolve against `final_url`,
    /// which equals `url` unless the server redirected.
    async fn fetch_html(&self, url: &Url) -> GatewayResult<FetchedPage>;
}

/// Judges what kind of page a document is
#[async_trait]
pub trait PageClassifier: Send + Sync {
    /// Implementations should fail soft, returning
    /// `PageClassification::soft_fail` rather than an error where they can.
    /// Callers downgrade any error they do receive the same way.
    async fn classify_page(
        &self,
        html: &str,
        url: &Url,
        context: &ClassificationContext,
    ) -> GatewayResult<PageClassification>;
}

/// Pulls links out of a document
pub trait LinkExtractor: Send + Sync {
    /// Fails with `GatewayError::InvalidInput` when `html` is empty
    fn extract_links(&self, html: &str, base_url: &Url) -> GatewayResult<Vec<Link>>;
}

/// Judges where links lead
#[async_trait]
pub trait LinkClassifier: Send + Sync {
    /// Empty input must produce empty output without calling any service
    async fn classify_links(
        &self,
        links: &[Link],
        context: &ClassificationContext,
    ) -> GatewayResult<Vec<LinkClassification>>;
}

/// Reads roster members out of a document
#[async_trait]
pub trait MemberExtractor: Send + Sync {
    async fn extract_members(
        &self,
        html: &str,
        url: &Url,
        context: &ClassificationContext,
    ) -> GatewayResult<MemberExtraction>;
}

/// Shared handles to every collaborator a session needs
///
/// Cloning is cheap; sessions running concurrently share the same handles
/// and no mutable state.
#[derive(Clone)]
pub struct Gateways {
    pub fetcher: Arc<dyn HtmlFetcher>,
    pub page_classifier: Arc<dyn PageClassifier>,
    pub link_extractor: Arc<dyn LinkExtractor>,
    pub link_classifier: Arc<dyn LinkClassifier>,
    pub member_extractor: Arc<dyn MemberExtractor>,
}

impl Gateways {
    /// Bundles an HTTP fetcher, the HTML link extractor and one model-backed
    /// gateway serving all three classification/extraction roles
    pub fn new(fetcher: HttpFetcher, llm: LlmGateway) -> Self {
        let llm = Arc::new(llm);
        Self {
            fetcher: Arc::new(fetcher),
            page_classifier: llm.clone(),
            link_extractor: Arc::new(HtmlLinkExtractor::new()),
            link_classifier: llm.clone(),
            member_extractor: llm,
        }
    }

    /// Bundles one value implementing every collaborator trait
    pub fn from_single<T>(gateway: Arc<T>) -> Self
    where
        T: HtmlFetcher
            + PageClassifier
            + LinkExtractor
            + LinkClassifier
            + MemberExtractor
            + 'static,
    {
        Self {
            fetcher: gateway.clone(),
            page_classifier: gateway.clone(),
            link_extractor: gateway.clone(),
            link_classifier: gateway.clone(),
            member_extractor: gateway,
        }
    }
}
