//! Deployment errors

use crate::report::DeployReport;
use skyfleet_cloud::{CloudError, Provider, ScenarioStatus};
use skyfleet_terraform::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("No usable credentials for {0}. Add them to the credentials file or environment")]
    AuthMissing(Provider),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Scenario {scenario} is {from} and cannot become {to}")]
    InvalidTransition {
        scenario: String,
        from: ScenarioStatus,
        to: ScenarioStatus,
    },

    #[error("Scenario {scenario} still holds {placed} node(s) from an earlier partial deploy; run cleanup first")]
    NeedsCleanup { scenario: String, placed: u32 },

    #[error("All candidate regions are out of capacity. {report}")]
    QuotaExhausted { report: Box<DeployReport> },

    #[error("Deploy incomplete. {report}")]
    Partial { report: Box<DeployReport> },

    #[error("Deploy aborted: {source}. {report}")]
    Engine {
        report: Box<DeployReport>,
        source: EngineError,
    },

    #[error("Deploy cancelled. {report}")]
    Cancelled { report: Box<DeployReport> },

    #[error(transparent)]
    Terraform(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] CloudError),

    #[error("Workspace error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Attempt report for failures that happened after provisioning started
    pub fn report(&self) -> Option<&DeployReport> {
        match self {
            DeployError::QuotaExhausted { report }
            | DeployError::Partial { report }
            | DeployError::Engine { report, .. }
            | DeployError::Cancelled { report } => Some(report),
            _ => None,
        }
    }

    /// Whether some nodes were left running and need a targeted cleanup
    pub fn left_partial_placement(&self) -> bool {
        self.report().is_some_and(|r| r.placed() > 0)
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
