use crate::model::{DiscoveryRequest, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_STEP_BUDGET};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Roster
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    pub user_agent: UserAgentConfig,
    pub gateway: GatewayConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "organization")]
    pub organizations: Vec<OrganizationEntry>,
}

impl Config {
    /// Builds one discovery request per configured organization
    ///
    /// Per-organization overrides take precedence over `[discovery]`.
    pub fn discovery_requests(&self) -> Vec<DiscoveryRequest> {
        self.organizations
            .iter()
            .map(|org| self.request_for(org))
            .collect()
    }

    /// Builds the discovery request for one organization
    pub fn request_for(&self, org: &OrganizationEntry) -> DiscoveryRequest {
        let defaults = &self.discovery;
        let mut request = DiscoveryRequest::new(
            &org.seed_url,
            &org.party_name,
            org.party_id,
            org.max_depth.unwrap_or(defaults.max_depth),
        )
        .with_step_budget(org.step_budget.unwrap_or(defaults.step_budget))
        .with_confidence_threshold(
            org.confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
        );

        if let Some(deadline) = defaults.deadline() {
            request = request.with_deadline(deadline);
        }

        request
    }
}

/// Discovery behavior shared by every organization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Maximum link depth below the seed URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages processed per session
    #[serde(default = "default_step_budget")]
    pub step_budget: u32,

    /// Minimum classifier confidence for acting on a page or following a link
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Optional wall-clock cutoff per session, in seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Maximum number of sessions running at once
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
}

impl DiscoveryConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            step_budget: default_step_budget(),
            confidence_threshold: default_confidence_threshold(),
            deadline_secs: None,
            max_concurrent_sessions: default_max_concurrent_sessions(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

/// Model-backed gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewayConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout for page fetches and model calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cap on page text sent to the model
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the markdown roster report
    pub summary_path: String,

    /// Path to the JSON session snapshot file
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

/// One organization to discover a roster for
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrganizationEntry {
    pub party_name: String,
    pub party_id: i64,
    pub seed_url: String,

    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub step_budget: Option<u32>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
}

fn default_max_depth() -> u32 {
    3
}

fn default_step_budget() -> u32 {
    DEFAULT_STEP_BUDGET
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_max_concurrent_sessions() -> usize {
    4
}

fn default_gateway_base_url() -> String {
    crate::gateway::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_page_chars() -> usize {
    crate::gateway::DEFAULT_MAX_PAGE_CHARS
}
