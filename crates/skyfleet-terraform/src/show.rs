//! Instance extraction from `terraform show -json`

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One compute instance found in engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDetail {
    pub address: String,
    pub id: String,
    pub region: String,
    /// Resource type, e.g. `alicloud_instance`
    pub kind: String,
    pub instance_type: Option<String>,
    pub status: String,
    pub public_ips: Vec<String>,
    pub private_ips: Vec<String>,
}

const REGION_KEYS: &[&str] = &["region_id", "region", "availability_zone"];
const STATUS_KEYS: &[&str] = &["status", "instance_status", "power_status", "instance_state"];
const TYPE_KEYS: &[&str] = &["instance_type", "flavor_name", "plan"];
const PUBLIC_IP_KEYS: &[&str] = &["public_ip", "public_ips", "main_ip", "access_ip_v4"];
const PRIVATE_IP_KEYS: &[&str] = &["private_ip", "private_ips", "internal_ip"];

/// Parse the JSON document printed by `terraform show -json`.
///
/// Walks the root module and every child module; only resources whose type
/// names an instance are returned. A document without `values` (no state
/// yet) yields an empty list.
pub fn parse_resources(json: &str) -> Result<Vec<ResourceDetail>> {
    let document: Value = serde_json::from_str(json)?;
    let mut details = Vec::new();
    if let Some(root) = document.pointer("/values/root_module") {
        collect_module(root, &mut details);
    }
    Ok(details)
}

fn collect_module(module: &Value, out: &mut Vec<ResourceDetail>) {
    if let Some(resources) = module.get("resources").and_then(Value::as_array) {
        out.extend(resources.iter().filter_map(resource_detail));
    }
    if let Some(children) = module.get("child_modules").and_then(Value::as_array) {
        for child in children {
            collect_module(child, out);
        }
    }
}

fn resource_detail(resource: &Value) -> Option<ResourceDetail> {
    if resource.get("mode").and_then(Value::as_str) == Some("data") {
        return None;
    }
    let kind = resource.get("type")?.as_str()?;
    if !kind.contains("instance") {
        return None;
    }
    let values = resource.get("values")?;

    Some(ResourceDetail {
        address: string_field(resource, &["address"]).unwrap_or_default(),
        id: string_field(values, &["id", "instance_id"]).unwrap_or_default(),
        region: string_field(values, REGION_KEYS).unwrap_or_default(),
        kind: kind.to_string(),
        instance_type: string_field(values, TYPE_KEYS),
        status: string_field(values, STATUS_KEYS).unwrap_or_default(),
        public_ips: ip_list(values, PUBLIC_IP_KEYS),
        private_ips: ip_list(values, PRIVATE_IP_KEYS),
    })
}

fn string_field(values: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| values.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// IP fields are a string on some providers and a list on others
fn ip_list(values: &Value, keys: &[&str]) -> Vec<String> {
    let mut ips = Vec::new();
    for key in keys {
        match values.get(*key) {
            Some(Value::String(ip)) if !ip.is_empty() => ips.push(ip.clone()),
            Some(Value::Array(items)) => ips.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|ip| !ip.is_empty())
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    ips.dedup();
    ips
}
