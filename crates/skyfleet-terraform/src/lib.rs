//! skyfleet provisioning engine
//!
//! The boundary to the infrastructure-as-code engine: skyfleet never plans
//! or applies anything itself, it drives `terraform` per working directory
//! and reads back what the engine reports.
//!
//! - [`ProvisioningEngine`]: init / validate / plan / apply / destroy and
//!   state inspection for one working directory
//! - [`Terraform`]: the subprocess implementation, with per-command timeout
//!   and cancellation that terminates the child process
//! - [`classify`]: the single translation layer from engine output to
//!   [`EngineErrorKind`]
//!
//! ```ignore
//! let engine = Terraform::new("terraform");
//! let ctx = EngineContext::new(&workdir, env, cancel);
//! engine.init(&ctx).await?;
//! engine.apply(&ctx, true, &vars).await?;
//! ```

pub mod classify;
pub mod engine;
pub mod error;
pub mod show;
pub mod terraform;

pub use engine::{EngineContext, EngineVars, ProvisioningEngine, SecretEnv};
pub use error::{EngineError, EngineErrorKind, Operation, Result};
pub use show::ResourceDetail;
pub use terraform::{DESTROY_PLAN_FILE, PLAN_FILE, STATE_FILE, Terraform};
