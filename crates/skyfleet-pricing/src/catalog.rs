//! Static price catalog
//!
//! Fixed hourly prices for offline estimates and for providers that have
//! no live pricing client. Entries are keyed by either a template family
//! (`aliyun/ecs`) or a concrete instance type, and are region independent.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use skyfleet_cloud::{Currency, PriceQuote, PriceQuoteClient, Provider, QuoteError, TemplateRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub provider: Provider,
    pub key: String,
    pub price_per_hour: Decimal,
    pub currency: Currency,
    pub spec: String,
}

impl CatalogEntry {
    pub fn new(
        provider: Provider,
        key: impl Into<String>,
        price_per_hour: Decimal,
        currency: Currency,
        spec: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            key: key.into(),
            price_per_hour,
            currency,
            spec: spec.into(),
        }
    }

    pub fn to_quote(&self, region: &str, instance_type: &str) -> PriceQuote {
        PriceQuote::new(self.provider, region, instance_type, self.price_per_hour, self.currency)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogPriceClient {
    entries: Vec<CatalogEntry>,
}

impl Default for CatalogPriceClient {
    fn default() -> Self {
        Self::new(vec![
            CatalogEntry::new(Provider::Aliyun, "ecs", dec!(0.08), Currency::Cny, "1 vCPU, 1 GiB"),
            CatalogEntry::new(Provider::Aliyun, "ecs1c2g", dec!(0.16), Currency::Cny, "1 vCPU, 2 GiB"),
            CatalogEntry::new(Provider::Aliyun, "aliyun-proxy", dec!(0.05), Currency::Cny, "1 vCPU, 0.5 GiB spot"),
            CatalogEntry::new(Provider::Tencent, "ecs", dec!(0.07), Currency::Cny, "1 vCPU, 1 GiB"),
            CatalogEntry::new(Provider::Aws, "ec2", dec!(0.0104), Currency::Usd, "t3.micro"),
            CatalogEntry::new(Provider::Aws, "ec2-1G", dec!(0.0208), Currency::Usd, "t3.small"),
            CatalogEntry::new(Provider::Vultr, "hk-vps", dec!(0.006), Currency::Usd, "1 vCPU, 1 GiB"),
        ])
    }
}

impl CatalogPriceClient {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn lookup(&self, provider: Provider, key: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.provider == provider && e.key == key)
    }

    /// Catalog entry for a template's family
    pub fn estimate(&self, template: &TemplateRef) -> Option<&CatalogEntry> {
        self.lookup(template.provider()?, template.family()?)
    }
}

#[async_trait]
impl PriceQuoteClient for CatalogPriceClient {
    fn supports(&self, provider: Provider) -> bool {
        self.entries.iter().any(|e| e.provider == provider)
    }

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> Result<PriceQuote, QuoteError> {
        if !self.supports(provider) {
            return Err(QuoteError::Unsupported(format!("no catalog prices for {}", provider)));
        }
        self.lookup(provider, instance_type)
            .map(|entry| entry.to_quote(region, instance_type))
            .ok_or_else(|| QuoteError::NotFound(format!("{}/{} not in catalog", provider, instance_type)))
    }
}
