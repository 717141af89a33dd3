//! Deploy with region failover
//!
//! [`DeploymentOrchestrator`] owns the scenario lifecycle. It resolves
//! secrets through [`CredentialResolver`], orders candidate regions with
//! the optional price optimizer and capacity probe, then drives the
//! provisioning engine region by region. Multi-node requests that hit
//! quota limits are split into fragments by a [`FragmentStrategy`].

pub mod error;
pub mod fragment;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod workspace;

pub use error::{DeployError, Result};
pub use fragment::{EvenFragments, FragmentStrategy, UnitFragments};
pub use orchestrator::{DeployOptions, DeployRequest, DeploymentOrchestrator};
pub use report::{AttemptOutcome, DeployReport, RegionAttempt, StatusReport};
pub use resolver::{CredentialResolver, KeyPart, SecretField, required_secrets, required_secrets_for};
pub use workspace::{CopyWorkdir, FRAGMENTS_DIR, WorkspacePreparer, fragment_dir};
