//! Error types for the card pricing service

use thiserror::Error;

/// Errors that can occur when fetching printings from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Outcome of a pricing computation that did not produce market data
///
/// This type is `Clone` because a single failed computation is handed to
/// every caller that was waiting on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    /// The caller cancelled the request before it completed
    #[error("Pricing request cancelled")]
    Cancelled,

    /// The provider answered but no usable prices survived filtering
    #[error("No competitive price data for {card}")]
    NoData { card: String },

    /// The provider could not be reached or answered with an error
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// The service could not run the computation (e.g. scheduler closed)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PricingError {
    /// Creates a NoData error
    pub fn no_data(card: &str) -> Self {
        Self::NoData {
            card: card.to_string(),
        }
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ProviderError> for PricingError {
    fn from(err: ProviderError) -> Self {
        Self::ProviderFailure(err.to_string())
    }
}
