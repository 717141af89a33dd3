//! Spot capacity signals

use crate::error::QuoteError;
use crate::provider::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether a provider currently sells capacity for an instance type in a region.
///
/// Spot capacity moves quickly, so these are never cached past one deploy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionAvailability {
    pub region: String,
    pub instance_type: String,
    pub available: bool,
}

impl RegionAvailability {
    pub fn new(region: impl Into<String>, instance_type: impl Into<String>, available: bool) -> Self {
        Self {
            region: region.into(),
            instance_type: instance_type.into(),
            available,
        }
    }
}

/// Provider-specific capacity signal for one region
#[async_trait]
pub trait CapacitySignal: Send + Sync {
    fn provider(&self) -> Provider;

    /// Per-instance-type availability of `instance_family` in `region`
    async fn probe(
        &self,
        region: &str,
        instance_family: &str,
    ) -> Result<Vec<RegionAvailability>, QuoteError>;
}
