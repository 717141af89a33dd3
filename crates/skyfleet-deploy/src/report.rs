//! Structured deploy results

use skyfleet_cloud::{Phase, Placement, Scenario};
use skyfleet_terraform::{EngineError, EngineErrorKind, ResourceDetail};
use std::fmt;

/// What happened to one region attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Placed,
    QuotaExceeded(String),
    Failed {
        kind: EngineErrorKind,
        message: String,
    },
    Cancelled,
}

impl AttemptOutcome {
    pub fn from_error(error: &EngineError) -> Self {
        if error.is_cancelled() {
            return AttemptOutcome::Cancelled;
        }
        match error.kind() {
            EngineErrorKind::QuotaExceeded => AttemptOutcome::QuotaExceeded(error.to_string()),
            kind => AttemptOutcome::Failed {
                kind,
                message: error.to_string(),
            },
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Placed => write!(f, "placed"),
            AttemptOutcome::QuotaExceeded(_) => write!(f, "quota exceeded"),
            AttemptOutcome::Failed { kind, .. } => write!(f, "{}", kind),
            AttemptOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One provisioning attempt against one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAttempt {
    /// `None` when the template chose its own region
    pub region: Option<String>,
    pub nodes: u32,
    /// Part of a fragmented placement
    pub fragment: bool,
    pub outcome: AttemptOutcome,
}

impl RegionAttempt {
    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or("template default")
    }
}

/// Everything a deploy call tried, in order
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub scenario: String,
    pub requested: u32,
    pub phase: Phase,
    pub fragmented: bool,
    pub attempts: Vec<RegionAttempt>,
    pub placements: Vec<Placement>,
}

impl DeployReport {
    pub fn new(scenario: impl Into<String>, requested: u32) -> Self {
        Self {
            scenario: scenario.into(),
            requested,
            phase: Phase::Pending,
            fragmented: false,
            attempts: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn placed(&self) -> u32 {
        self.placements.iter().map(|p| p.nodes).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.placed() >= self.requested
    }

    /// Regions attempted, in order, including failures
    pub fn attempted_regions(&self) -> Vec<&str> {
        self.attempts.iter().map(RegionAttempt::region_label).collect()
    }

    pub(crate) fn advance(&mut self, next: Phase) {
        if self.phase.can_advance_to(next) {
            tracing::debug!(scenario = %self.scenario, from = %self.phase, to = %next, "deploy phase");
            self.phase = next;
        }
    }

    pub(crate) fn record(&mut self, region: Option<&str>, nodes: u32, fragment: bool, outcome: AttemptOutcome) {
        self.attempts.push(RegionAttempt {
            region: region.map(str::to_string),
            nodes,
            fragment,
            outcome,
        });
    }
}

impl fmt::Display for DeployReport {
    /// e.g. `3 of 4 requested nodes placed (ap-shanghai: 1, ap-nanjing: 1, ap-guangzhou: 1); ap-beijing: quota exceeded`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} requested nodes placed", self.placed(), self.requested)?;
        if !self.placements.is_empty() {
            let placed: Vec<String> = self
                .placements
                .iter()
                .map(|p| format!("{}: {}", p.region, p.nodes))
                .collect();
            write!(f, " ({})", placed.join(", "))?;
        }
        let failed: Vec<String> = self
            .attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Placed)
            .map(|a| format!("{}: {}", a.region_label(), a.outcome))
            .collect();
        if !failed.is_empty() {
            write!(f, "; {}", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Best-effort view of what a scenario has provisioned
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub scenario: Scenario,
    pub resources: Vec<String>,
    pub details: Vec<ResourceDetail>,
    /// Engine errors that were skipped while gathering
    pub warnings: Vec<String>,
}
