//! skyfleet cloud domain
//!
//! Shared vocabulary for the skyfleet crates: providers, templates,
//! scenarios, price quotes and credentials, plus the seams that provider
//! crates implement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  skyfleet CLI                    │
//! │         (price / probe / deploy / destroy)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │   skyfleet-deploy        skyfleet-pricing        │
//! │   (orchestrator)         (optimizer, probe)      │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼─────────────────────────▼───────────────┐
//! │                skyfleet-cloud                    │
//! │  trait PriceQuoteClient   trait CapacitySignal   │
//! │  Scenario / ScenarioStore  FanOut  Credentials   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐ ┌──────────────┐
//! │    aliyun     │ │    tencent    │ │  terraform   │
//! │ (signed RPC)  │ │   (tccli)     │ │  (engine)    │
//! └───────────────┘ └───────────────┘ └──────────────┘
//! ```

pub mod capacity;
pub mod credentials;
pub mod error;
pub mod pool;
pub mod provider;
pub mod quote;
pub mod scenario;
pub mod state;
pub mod template;

// Re-exports
pub use capacity::{CapacitySignal, RegionAvailability};
pub use credentials::{CredentialSet, CredentialStore, StaticCredentialStore};
pub use error::{CloudError, QuoteError, Result};
pub use pool::{FanOut, TaskOutcome};
pub use provider::{CredentialEnv, Provider};
pub use quote::{Currency, HOURS_PER_MONTH, OptimalConfig, PriceQuote, PriceQuoteClient};
pub use scenario::{Phase, Placement, Scenario, ScenarioStatus};
pub use state::{FileScenarioStore, ScenarioFile, ScenarioLock, ScenarioStore};
pub use template::{NodeScaling, TemplateKind, TemplateRef};

pub use tokio_util::sync::CancellationToken;
