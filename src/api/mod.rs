//! Client for the backend that stores providers, models, sessions and MCP servers.

pub mod cache;
pub mod client;
pub mod models;
pub mod retry;
pub mod validation;

use thiserror::Error;

pub use cache::{cache_key, CacheStats, RequestCache};
pub use client::ApiClient;
pub use models::{
    ApiSession, McpRegistration, McpServer, McpStats, Model, ModelDraft, ModelType, Provider,
    ProviderAdapter, ProviderDraft, ProviderTestResponse, SessionHistory,
};
pub use retry::{with_retry, RetryPolicy};
pub use validation::{validate_model, validate_provider, ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// Server errors and transport failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) | ApiError::Validation(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
