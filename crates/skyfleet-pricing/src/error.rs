//! Price selection errors

use skyfleet_cloud::Provider;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimizeError {
    #[error("No quotes available from {} ({attempted} candidates tried)", join(.providers))]
    NoQuotesAvailable {
        providers: Vec<Provider>,
        attempted: usize,
    },

    #[error("Price lookup is not supported for {0}")]
    Unsupported(Provider),

    #[error("No usable credentials for {0}")]
    AuthMissing(Provider),

    #[error("Template does not name a known provider: {0}")]
    UnknownTemplate(String),

    #[error("Price lookup cancelled")]
    Cancelled,
}

fn join(providers: &[Provider]) -> String {
    providers
        .iter()
        .map(Provider::name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
