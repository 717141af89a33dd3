//! Spot capacity via DescribeAvailableResource

use crate::error::{AliyunError, Result};
use crate::rpc::EcsClient;
use async_trait::async_trait;
use serde::Deserialize;
use skyfleet_cloud::{CapacitySignal, CredentialStore, Provider, QuoteError, RegionAvailability};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DescribeAvailableResourceResponse {
    #[serde(rename = "AvailableZones", default)]
    available_zones: AvailableZones,
}

#[derive(Debug, Default, Deserialize)]
struct AvailableZones {
    #[serde(rename = "AvailableZone", default)]
    zones: Vec<AvailableZone>,
}

#[derive(Debug, Deserialize)]
struct AvailableZone {
    #[serde(rename = "ZoneId", default)]
    zone_id: String,
    #[serde(rename = "AvailableResources", default)]
    resources: AvailableResources,
}

#[derive(Debug, Default, Deserialize)]
struct AvailableResources {
    #[serde(rename = "AvailableResource", default)]
    items: Vec<AvailableResource>,
}

#[derive(Debug, Deserialize)]
struct AvailableResource {
    #[serde(rename = "SupportedResources", default)]
    supported: SupportedResources,
}

#[derive(Debug, Default, Deserialize)]
struct SupportedResources {
    #[serde(rename = "SupportedResource", default)]
    items: Vec<SupportedResource>,
}

#[derive(Debug, Deserialize)]
struct SupportedResource {
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "Status", default)]
    status: String,
}

/// Reports which instance types of a family can be bought as spot
pub struct AliyunCapacitySignal {
    ecs: EcsClient,
    credentials: Arc<dyn CredentialStore>,
}

impl AliyunCapacitySignal {
    pub fn new(ecs: EcsClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { ecs, credentials }
    }

    async fn spot_availability(
        &self,
        region: &str,
        instance_family: &str,
    ) -> Result<Vec<RegionAvailability>> {
        let credentials = self
            .credentials
            .credentials(Provider::Aliyun)
            .ok_or(AliyunError::MissingCredentials)?;

        let response: DescribeAvailableResourceResponse = self
            .ecs
            .call(
                &credentials,
                "DescribeAvailableResource",
                &[
                    ("RegionId", region),
                    ("DestinationResource", "InstanceType"),
                    ("InstanceChargeType", "PostPaid"),
                    ("SpotStrategy", "SpotAsPriceGo"),
                ],
            )
            .await?;

        Ok(availability_by_type(region, instance_family, &response))
    }
}

/// `ecs.t5` covers `ecs.t5-lc1m1.small` but not `ecs.t6-c1m1.large`
fn in_family(instance_type: &str, family: &str) -> bool {
    match instance_type.strip_prefix(family) {
        Some(rest) => rest.is_empty() || rest.starts_with('-') || rest.starts_with('.'),
        None => false,
    }
}

/// An instance type counts as available if any zone sells it
fn availability_by_type(
    region: &str,
    instance_family: &str,
    response: &DescribeAvailableResourceResponse,
) -> Vec<RegionAvailability> {
    let mut by_type: BTreeMap<&str, bool> = BTreeMap::new();
    for zone in &response.available_zones.zones {
        for resource in zone.resources.items.iter().flat_map(|r| &r.supported.items) {
            if !in_family(&resource.value, instance_family) {
                continue;
            }
            let available = resource.status == "Available";
            tracing::trace!(zone = %zone.zone_id, instance_type = %resource.value, available, "spot stock");
            *by_type.entry(resource.value.as_str()).or_insert(false) |= available;
        }
    }
    by_type
        .into_iter()
        .map(|(instance_type, available)| RegionAvailability::new(region, instance_type, available))
        .collect()
}

#[async_trait]
impl CapacitySignal for AliyunCapacitySignal {
    fn provider(&self) -> Provider {
        Provider::Aliyun
    }

    async fn probe(
        &self,
        region: &str,
        instance_family: &str,
    ) -> std::result::Result<Vec<RegionAvailability>, QuoteError> {
        self.spot_availability(region, instance_family)
            .await
            .map_err(|e| e.to_quote_error())
    }
}
