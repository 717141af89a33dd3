//! Cloud domain error types

use crate::provider::Provider;
use crate::scenario::ScenarioStatus;
use thiserror::Error;

/// Errors raised by the domain core and the scenario store
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Scenario already exists: {0}")]
    ScenarioAlreadyExists(String),

    #[error("Invalid status transition for scenario {scenario}: {from} -> {to}")]
    InvalidTransition {
        scenario: String,
        from: ScenarioStatus,
        to: ScenarioStatus,
    },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Classified failure of a single price or capacity query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Provider or operation has no implementation
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// No credentials configured, or the provider rejected them
    #[error("No usable credentials for {0}")]
    AuthMissing(Provider),

    /// Network failure, throttling or timeout
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The provider has no price for the requested pair
    #[error("Not found: {0}")]
    NotFound(String),
}

impl QuoteError {
    /// Errors that must stop the whole query round instead of dropping one pair
    pub fn is_fatal(&self) -> bool {
        matches!(self, QuoteError::AuthMissing(_) | QuoteError::Unsupported(_))
    }
}
