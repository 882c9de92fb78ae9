//! Sumi-Roster: a roster discovery crawler
//!
//! This crate walks the pages of a single organization's website, starting from
//! one seed URL, and uses external page/link classification to decide where to
//! go next. Pages recognized as member lists are handed to an extractor, and the
//! people found there are accumulated into a deduplicated roster.

pub mod config;
pub mod crawler;
pub mod gateway;
pub mod model;
pub mod output;
pub mod state;
pub mod testing;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Roster operations
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Discovery driver failure: {0}")]
    Driver(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// Raised to the caller as an input-validation failure and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised by the fetch/classification/extraction collaborators
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid gateway input: {0}")]
    InvalidInput(String),

    #[error("Gateway API error: {0}")]
    Api(String),

    #[error("Gateway configuration error: {0}")]
    Config(String),
}

/// Errors raised when constructing domain values
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("Roster member name cannot be empty")]
    EmptyMemberName,
}

/// Result type alias for Sumi-Roster operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{decide, Action, Coordinator, SessionDriver};
pub use model::{DiscoveryRequest, PageClassification, PageType, RosterMember};
pub use state::RosterDiscoverySession;
pub use url::{normalize, NormalizedUrl};
