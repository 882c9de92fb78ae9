use crate::config::types::{
    Config, DiscoveryConfig, GatewayConfig, OrganizationEntry, OutputConfig, UserAgentConfig,
};
use crate::url::normalize;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound on concurrently running sessions
const MAX_CONCURRENT_SESSIONS: usize = 64;

/// Upper bound on a session deadline (one week)
const MAX_DEADLINE_SECS: u64 = 7 * 24 * 60 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_discovery_config(&config.discovery)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_gateway_config(&config.gateway)?;
    validate_output_config(&config.output)?;
    validate_organizations(&config.organizations)?;
    Ok(())
}

/// Validates discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    validate_threshold("confidence-threshold", config.confidence_threshold)?;
    validate_step_budget("step-budget", config.step_budget)?;

    if config.max_concurrent_sessions < 1 || config.max_concurrent_sessions > MAX_CONCURRENT_SESSIONS
    {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-sessions must be between 1 and {}, got {}",
            MAX_CONCURRENT_SESSIONS, config.max_concurrent_sessions
        )));
    }

    if let Some(secs) = config.deadline_secs {
        if secs == 0 || secs > MAX_DEADLINE_SECS {
            return Err(ConfigError::Validation(format!(
                "deadline-secs must be between 1 and {} when set, got {}",
                MAX_DEADLINE_SECS, secs
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates model gateway configuration
fn validate_gateway_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid gateway base-url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "gateway base-url must be http(s), got '{}'",
            config.base_url
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("gateway model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "gateway api-key-env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "gateway request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_page_chars == 0 {
        return Err(ConfigError::Validation(
            "gateway max-page-chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.snapshot_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "snapshot-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates organization entries
fn validate_organizations(organizations: &[OrganizationEntry]) -> Result<(), ConfigError> {
    let mut party_ids = HashSet::new();

    for org in organizations {
        if org.party_name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Organization {} must have a party-name",
                org.party_id
            )));
        }

        if !party_ids.insert(org.party_id) {
            return Err(ConfigError::Validation(format!(
                "Duplicate party-id {}",
                org.party_id
            )));
        }

        normalize(&org.seed_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", org.seed_url, e))
        })?;

        if let Some(threshold) = org.confidence_threshold {
            validate_threshold(&format!("{} confidence-threshold", org.party_name), threshold)?;
        }
        if let Some(budget) = org.step_budget {
            validate_step_budget(&format!("{} step-budget", org.party_name), budget)?;
        }
    }

    Ok(())
}

fn validate_threshold(field: &str, threshold: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and 1, got {}",
            field, threshold
        )));
    }
    Ok(())
}

fn validate_step_budget(field: &str, budget: u32) -> Result<(), ConfigError> {
    if budget < 1 {
        return Err(ConfigError::Validation(format!("{} must be >= 1", field)));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
