// @file: src/core/errors.rs
// @description: Error taxonomy for session bootstrap, pagination and snapshot storage.
// @author: LAS.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Could not reach the provider: {0}")]
    Connectivity(String),

    #[error("Auth token cookie '{0}' missing after bootstrap")]
    MissingToken(String),

    #[error("Provider blocked the request (HTTP 403). Wait 1-2 minutes and try again")]
    Blocked,

    #[error("Still rate limited (HTTP 429) after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("HTTP error {0} from provider")]
    Http(u16),

    #[error("Provider returned no data for {0}")]
    NoData(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unexpected error while querying {context}: {message}")]
    Unexpected { context: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Wraps internal failures for callers of the public operations.
    pub fn at_boundary(self, context: &str) -> Self {
        match self {
            FetchError::MalformedPayload(message) | FetchError::Serialization(message) => {
                FetchError::Unexpected { context: context.to_string(), message }
            }
            other => other,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for FetchError {
    fn from(e: config::ConfigError) -> Self {
        FetchError::Config(e.to_string())
    }
}
