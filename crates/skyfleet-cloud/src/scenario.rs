//! Scenario records and their lifecycle

use crate::error::{CloudError, Result};
use crate::template::{TemplateKind, TemplateRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Persisted status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Pending,
    Deployed,
    Destroyed,
}

impl ScenarioStatus {
    /// `pending -> deployed -> destroyed`, nothing else
    pub fn can_transition_to(&self, next: ScenarioStatus) -> bool {
        matches!(
            (self, next),
            (ScenarioStatus::Pending, ScenarioStatus::Deployed)
                | (ScenarioStatus::Deployed, ScenarioStatus::Destroyed)
        )
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Pending => write!(f, "pending"),
            ScenarioStatus::Deployed => write!(f, "deployed"),
            ScenarioStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Phase of one deploy call. `Failed` is never stored; the scenario stays pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Deploying,
    Deployed,
    Failed,
}

impl Phase {
    pub fn can_advance_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Pending, Phase::Deploying)
                | (Phase::Deploying, Phase::Deployed)
                | (Phase::Deploying, Phase::Failed)
                | (Phase::Failed, Phase::Deploying)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Pending => "pending",
            Phase::Deploying => "deploying",
            Phase::Deployed => "deployed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where (and with which variables) a set of nodes was provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub region: String,
    pub nodes: u32,
    pub working_dir: PathBuf,
    /// Non-secret engine variables; destroy reuses them
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// A single provisioning attempt against one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub template: TemplateRef,
    /// Resolved once at creation; `None` for unrecognized templates
    pub kind: Option<TemplateKind>,
    pub status: ScenarioStatus,
    pub working_dir: PathBuf,
    /// Region fixed at creation time
    #[serde(default)]
    pub region: Option<String>,
    /// Single-directory placement of a deployed scenario
    #[serde(default)]
    pub placement: Option<Placement>,
    /// Per-region fragments, each with its own working directory
    #[serde(default)]
    pub fragments: Vec<Placement>,
    /// Variables of the latest apply in `working_dir`, placed or not.
    /// Destroy reuses them for resources a failed apply left behind.
    #[serde(default)]
    pub attempt_vars: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<TemplateRef>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        let template = template.into();
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind: TemplateKind::resolve(&template),
            template,
            status: ScenarioStatus::Pending,
            working_dir: working_dir.into(),
            region: None,
            placement: None,
            fragments: Vec::new(),
            attempt_vars: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Move to `next`, rejecting skipped or backward transitions
    pub fn transition(&mut self, next: ScenarioStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CloudError::InvalidTransition {
                scenario: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        tracing::info!(scenario = %self.id, from = %self.status, to = %next, "scenario status changed");
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Nodes across every recorded placement
    pub fn placed_nodes(&self) -> u32 {
        self.placement.iter().chain(&self.fragments).map(|p| p.nodes).sum()
    }
}
