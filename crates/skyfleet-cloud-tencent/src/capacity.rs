//! Spot capacity signal

use crate::error::TencentError;
use crate::tccli::{InstanceTypeQuota, Tccli};
use async_trait::async_trait;
use skyfleet_cloud::{CapacitySignal, CredentialStore, Provider, QuoteError, RegionAvailability};
use std::collections::BTreeMap;
use std::sync::Arc;

const SPOT_CHARGE_TYPE: &str = "SPOTPAID";

/// Reads the `SELL` status of spot instance types in each zone of a region
pub struct TencentCapacitySignal {
    tccli: Tccli,
    credentials: Arc<dyn CredentialStore>,
}

impl TencentCapacitySignal {
    pub fn new(tccli: Tccli, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { tccli, credentials }
    }
}

/// Collapse zones: a type is available when any zone sells it
fn by_instance_type(region: &str, quotas: &[InstanceTypeQuota]) -> Vec<RegionAvailability> {
    let mut selling: BTreeMap<&str, bool> = BTreeMap::new();
    for quota in quotas {
        *selling.entry(quota.instance_type.as_str()).or_insert(false) |= quota.is_selling();
    }
    selling
        .into_iter()
        .map(|(instance_type, available)| RegionAvailability::new(region, instance_type, available))
        .collect()
}

#[async_trait]
impl CapacitySignal for TencentCapacitySignal {
    fn provider(&self) -> Provider {
        Provider::Tencent
    }

    async fn probe(
        &self,
        region: &str,
        instance_family: &str,
    ) -> Result<Vec<RegionAvailability>, QuoteError> {
        let credentials = self
            .credentials
            .credentials(Provider::Tencent)
            .ok_or_else(|| TencentError::MissingCredentials.to_quote_error())?;

        let quotas = self
            .tccli
            .describe_zone_instance_configs(&credentials, region, instance_family, SPOT_CHARGE_TYPE)
            .await
            .map_err(|e| e.to_quote_error())?;

        tracing::debug!(region = %region, family = %instance_family, entries = quotas.len(), "spot configs");
        Ok(by_instance_type(region, &quotas))
    }
}
