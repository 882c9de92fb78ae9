//! Model-backed classification and extraction
//!
//! `LlmGateway` talks to an OpenAI-compatible chat completions endpoint and
//! asks for JSON object responses. Raw labels coming back from the model are
//! mapped through `PageType::from_label` / `LinkType::from_label`, and every
//! confidence is validated before it reaches the engine.

use crate::config::{GatewayConfig, UserAgentConfig};
use crate::gateway::prompts::{self, page_digest};
use crate::gateway::{build_http_client, LinkClassifier, MemberExtractor, PageClassifier};
use crate::model::{
    ClassificationContext, ExtractedMember, Link, LinkClassification, LinkType,
    MemberExtraction, PageClassification, PageType,
};
use crate::url::normalize;
use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default cap on page digest length sent to the model
pub const DEFAULT_MAX_PAGE_CHARS: usize = 30_000;

/// Classifier and extractor backed by a chat completions API
#[derive(Clone)]
pub struct LlmGateway {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_page_chars: usize,
}

impl LlmGateway {
    pub fn new(http: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }

    /// Builds a gateway from configuration, reading the API key from the
    /// environment variable named in `config.api_key_env`
    pub fn from_config(config: &GatewayConfig, user_agent: &UserAgentConfig) -> GatewayResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GatewayError::Config(format!("{} not set", config.api_key_env))
        })?;

        let http = build_http_client(user_agent, Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new(http, api_key, &config.model)
            .with_base_url(&config.base_url)
            .with_max_page_chars(config.max_page_chars))
    }

    /// Sets a custom base URL (proxies, self-hosted models)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_page_chars(mut self, max_page_chars: usize) -> Self {
        self.max_page_chars = max_page_chars;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one chat completion and deserializes the JSON object it returns
    async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: String,
    ) -> GatewayResult<T> {
        let start = Instant::now();

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat completion request failed");
                GatewayError::Api(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Chat completion API error");
            return Err(GatewayError::Api(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GatewayError::Api(format!("Malformed completion response: {}", e)))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Api("Empty completion response".to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion"
        );

        serde_json::from_str(&content)
            .map_err(|e| GatewayError::Api(format!("Model returned invalid JSON: {}", e)))
    }

    async fn try_classify_page(
        &self,
        html: &str,
        url: &Url,
        context: &ClassificationContext,
    ) -> GatewayResult<PageClassification> {
        let digest = page_digest(html, self.max_page_chars);
        let verdict: RawPageVerdict = self
            .complete_json(
                prompts::PAGE_SYSTEM_PROMPT,
                prompts::page_prompt(url, context, &digest),
            )
            .await?;

        let classification = PageClassification::new(
            PageType::from_label(&verdict.page_type),
            verdict.confidence,
            verdict.reason,
        )
        .map_err(|e| GatewayError::Classification(e.to_string()))?;

        Ok(classification
            .with_child_links(verdict.has_child_links)
            .with_member_info(verdict.has_member_info))
    }
}

#[async_trait]
impl PageClassifier for LlmGateway {
    /// Never returns an error; failures become `PageClassification::soft_fail`
    async fn classify_page(
        &self,
        html: &str,
        url: &Url,
        context: &ClassificationContext,
    ) -> GatewayResult<PageClassification> {
        match self.try_classify_page(html, url, context).await {
            Ok(classification) => Ok(classification),
            Err(e) => {
                warn!(url = %url, error = %e, "Page classification failed, treating as other");
                Ok(PageClassification::soft_fail(format!("classification failed: {}", e)))
            }
        }
    }
}

#[async_trait]
impl LinkClassifier for LlmGateway {
    async fn classify_links(
        &self,
        links: &[Link],
        context: &ClassificationContext,
    ) -> GatewayResult<Vec<LinkClassification>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let verdicts: RawLinkVerdicts = self
            .complete_json(
                prompts::LINKS_SYSTEM_PROMPT,
                prompts::links_prompt(context, links),
            )
            .await?;

        Ok(resolve_link_verdicts(links, verdicts.links))
    }
}

#[async_trait]
impl MemberExtractor for LlmGateway {
    async fn extract_members(
        &self,
        html: &str,
        url: &Url,
        context: &ClassificationContext,
    ) -> GatewayResult<MemberExtraction> {
        let digest = page_digest(html, self.max_page_chars);
        let result: GatewayResult<RawMemberList> = self
            .complete_json(
                prompts::MEMBERS_SYSTEM_PROMPT,
                prompts::members_prompt(url, context, &digest),
            )
            .await;

        Ok(match result {
            Ok(list) => MemberExtraction::succeeded(list.members),
            Err(e) => {
                warn!(url = %url, error = %e, "Member extraction failed");
                MemberExtraction::failed(e.to_string())
            }
        })
    }
}

/// Matches model verdicts back onto the links that were asked about
///
/// Verdicts for URLs that were not in the input, with unparseable URLs, or
/// with out-of-range confidences are dropped.
fn resolve_link_verdicts(links: &[Link], verdicts: Vec<RawLinkVerdict>) -> Vec<LinkClassification> {
    let by_key: HashMap<_, _> = links
        .iter()
        .filter_map(|link| normalize(link.url.as_str()).ok().map(|key| (key, &link.url)))
        .collect();

    verdicts
        .into_iter()
        .filter_map(|verdict| {
            let key = normalize(&verdict.url).ok()?;
            let Some(url) = by_key.get(&key) else {
                debug!(url = %verdict.url, "Dropping verdict for unknown link");
                return None;
            };

            LinkClassification::new(
                (*url).clone(),
                LinkType::from_label(&verdict.link_type),
                verdict.confidence,
                verdict.reason,
            )
            .map_err(|e| debug!(url = %verdict.url, error = %e, "Dropping invalid link verdict"))
            .ok()
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChoiceRaw>,
}

#[derive(Debug, Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
}

#[derive(Debug, Deserialize)]
struct MessageRaw {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPageVerdict {
    #[serde(default)]
    page_type: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    has_child_links: bool,
    #[serde(default)]
    has_member_info: bool,
}

#[derive(Debug, Deserialize)]
struct RawLinkVerdicts {
    #[serde(default)]
    links: Vec<RawLinkVerdict>,
}

#[derive(Debug, Deserialize)]
struct RawLinkVerdict {
    url: String,
    #[serde(default)]
    link_type: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct RawMemberList {
    #[serde(default)]
    members: Vec<ExtractedMember>,
}
