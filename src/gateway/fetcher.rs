//! HTTP fetcher implementation
//!
//! This module handles page downloads for discovery, including:
//! - Building HTTP clients with a contact-bearing user agent string
//! - GET requests with bounded redirects
//! - Classifying failures into fetch errors

use crate::config::UserAgentConfig;
use crate::gateway::{FetchedPage, HtmlFetcher};
use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_roster::config::UserAgentConfig;
/// use sumi_roster::gateway::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiRoster".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches page HTML over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from user agent settings
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> GatewayResult<Self> {
        let client = build_http_client(config, timeout)
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl HtmlFetcher for HttpFetcher {
    /// Fetches a URL and returns its body along with the URL that served it
    ///
    /// # Failure Mapping
    ///
    /// | Condition | Message |
    /// |-----------|---------|
    /// | HTTP 404 | `not found` |
    /// | HTTP 429 | `rate limited` |
    /// | Other non-2xx | `HTTP <status>` |
    /// | Non-HTML Content-Type | `expected HTML, got <type>` |
    /// | Timeout | `request timeout` |
    /// | Connection failure | `connection failed` |
    async fn fetch_html(&self, url: &Url) -> GatewayResult<FetchedPage> {
        let fetch_error = |message: String| GatewayError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_error("request timeout".to_string())
            } else if e.is_connect() {
                fetch_error("connection failed".to_string())
            } else if e.is_redirect() {
                fetch_error(format!("redirect error: {}", e))
            } else {
                fetch_error(e.to_string())
            }
        })?;

        let status = response.status();
        let final_url = response.url().clone();
        if status == StatusCode::NOT_FOUND {
            return Err(fetch_error("not found".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(fetch_error("rate limited".to_string()));
        }
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        // A missing Content-Type is tolerated; an explicit non-HTML one is not
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            return Err(fetch_error(format!("expected HTML, got {}", content_type)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;

        if final_url != *url {
            tracing::debug!(url = %url, final_url = %final_url, "Followed redirect");
        }
        tracing::debug!(url = %final_url, bytes = body.len(), "Fetched page");
        Ok(FetchedPage {
            final_url,
            html: body,
        })
    }
}
