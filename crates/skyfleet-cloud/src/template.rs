//! Template identity
//!
//! A [`TemplateRef`] is the `provider/family[/...]` path of a provisioning
//! template (e.g. `aliyun/ecs`, `tencent/tencent-proxy`,
//! `aliyun/aliyun-proxy/zone-node/ss-libev-node-sh`). It is classified once
//! into a [`TemplateKind`] when a scenario is created; everything downstream
//! switches on the kind instead of re-reading the string.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path-like template identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateRef(String);

impl TemplateRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider named by the first path segment
    pub fn provider(&self) -> Option<Provider> {
        self.segments().next()?.parse().ok()
    }

    /// Template family (second path segment)
    pub fn family(&self) -> Option<&str> {
        self.segments().nth(1)
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn kind(&self) -> Option<TemplateKind> {
        TemplateKind::resolve(self)
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TemplateRef {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// How a template scales with the requested node count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeScaling {
    /// Always one unit; no `node_count` variable
    Fixed,
    /// Accepts `node_count` and may be split across regions
    Elastic,
    /// Accepts `node_count` but must stay in one region
    Pinned,
}

/// Closed classification of templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateKind {
    StandardProvisioning {
        provider: Provider,
        scaling: NodeScaling,
    },
    /// Variant whose region is part of its identity
    RegionScopedProxy { provider: Provider, region: String },
    /// Runs an uploaded program; needs object storage credentials too
    TaskExecutor { provider: Provider },
}

/// Zone-node suffixes of region-scoped Aliyun proxy templates
const ALIYUN_ZONE_NODES: &[(&str, &str)] = &[
    ("bj", "cn-beijing"),
    ("sh", "cn-shanghai"),
    ("hhht", "cn-huhehaote"),
    ("wlcb", "cn-wulanchabu"),
    ("zjk", "cn-zhangjiakou"),
];

impl TemplateKind {
    /// Classify a template ref. Unknown providers yield `None`.
    pub fn resolve(template: &TemplateRef) -> Option<Self> {
        let provider = template.provider()?;
        let family = template.family().unwrap_or_default();

        if family.starts_with("task-executor") {
            return Some(TemplateKind::TaskExecutor { provider });
        }

        if let Some(region) = zone_node_region(provider, template) {
            return Some(TemplateKind::RegionScopedProxy { provider, region });
        }

        let scaling = if family.ends_with("-proxy-postpaid") {
            NodeScaling::Pinned
        } else if family.ends_with("-proxy") {
            NodeScaling::Elastic
        } else {
            NodeScaling::Fixed
        };

        Some(TemplateKind::StandardProvisioning { provider, scaling })
    }

    pub fn provider(&self) -> Provider {
        match self {
            TemplateKind::StandardProvisioning { provider, .. }
            | TemplateKind::RegionScopedProxy { provider, .. }
            | TemplateKind::TaskExecutor { provider } => *provider,
        }
    }

    /// Region encoded in the template itself
    pub fn fixed_region(&self) -> Option<&str> {
        match self {
            TemplateKind::RegionScopedProxy { region, .. } => Some(region),
            _ => None,
        }
    }

    pub fn scaling(&self) -> NodeScaling {
        match self {
            TemplateKind::StandardProvisioning { scaling, .. } => *scaling,
            TemplateKind::RegionScopedProxy { .. } => NodeScaling::Pinned,
            TemplateKind::TaskExecutor { .. } => NodeScaling::Fixed,
        }
    }

    pub fn accepts_node_count(&self) -> bool {
        self.scaling() != NodeScaling::Fixed
    }

    pub fn can_fragment(&self) -> bool {
        self.scaling() == NodeScaling::Elastic
    }
}

fn zone_node_region(provider: Provider, template: &TemplateRef) -> Option<String> {
    if provider != Provider::Aliyun || !template.as_str().contains("/zone-node/") {
        return None;
    }
    let leaf = template.segments().last()?;
    let (_, code) = leaf.rsplit_once("-node-")?;
    ALIYUN_ZONE_NODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, region)| region.to_string())
}
