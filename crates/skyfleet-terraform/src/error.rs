//! Provisioning engine error types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Engine command that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Init,
    Validate,
    Plan,
    Apply,
    Destroy,
    StateList,
    Show,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::Validate => "validate",
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
            Operation::StateList => "state list",
            Operation::Show => "show",
        };
        f.write_str(name)
    }
}

/// What an engine failure means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// Provider-side capacity or quota limit; another region may work
    QuotaExceeded,
    /// Credentials missing or rejected
    AuthError,
    Other,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::QuotaExceeded => write!(f, "quota exceeded"),
            EngineErrorKind::AuthError => write!(f, "auth error"),
            EngineErrorKind::Other => write!(f, "error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("terraform not found at '{0}'. Install it: https://developer.hashicorp.com/terraform/install")]
    NotInstalled(String),

    #[error("terraform {operation} failed ({kind}): {message}")]
    Failed {
        operation: Operation,
        kind: EngineErrorKind,
        message: String,
    },

    #[error("terraform {0} timed out after {1:?}")]
    Timeout(Operation, Duration),

    #[error("terraform {0} cancelled")]
    Cancelled(Operation),

    #[error("Unexpected terraform output: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::Failed { kind, .. } => *kind,
            _ => EngineErrorKind::Other,
        }
    }

    pub fn is_quota(&self) -> bool {
        self.kind() == EngineErrorKind::QuotaExceeded
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
