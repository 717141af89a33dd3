//! Price quotes and the quote client seam

use crate::error::{CloudError, QuoteError};
use crate::provider::Provider;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Hours in the 30-day month used for monthly estimates
pub const HOURS_PER_MONTH: u32 = 24 * 30;

/// Billing currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Cny,
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Cny => "CNY",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CNY" | "RMB" => Ok(Currency::Cny),
            "USD" => Ok(Currency::Usd),
            other => Err(CloudError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Price of one (region, instance type) pair in the provider's own currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub provider: Provider,
    pub region: String,
    pub instance_type: String,
    pub price_per_hour: Decimal,
    pub currency: Currency,
}

impl PriceQuote {
    pub fn new(
        provider: Provider,
        region: impl Into<String>,
        instance_type: impl Into<String>,
        price_per_hour: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            provider,
            region: region.into(),
            instance_type: instance_type.into(),
            price_per_hour,
            currency,
        }
    }

    /// Hourly price × 24 × 30
    pub fn price_per_month(&self) -> Decimal {
        self.price_per_hour * Decimal::from(HOURS_PER_MONTH)
    }
}

/// The cheapest quote of a candidate set, with the price it was ranked by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimalConfig {
    pub quote: PriceQuote,
    /// `quote.price_per_hour` converted to `reference_currency`
    pub normalized_price_per_hour: Decimal,
    pub reference_currency: Currency,
}

impl OptimalConfig {
    pub fn region(&self) -> &str {
        &self.quote.region
    }

    pub fn instance_type(&self) -> &str {
        &self.quote.instance_type
    }

    pub fn price_per_hour(&self) -> Decimal {
        self.quote.price_per_hour
    }

    pub fn price_per_month(&self) -> Decimal {
        self.quote.price_per_month()
    }

    /// Engine variables that pin a deploy to this configuration
    pub fn engine_vars(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("region".to_string(), self.quote.region.clone()),
            ("instance_type".to_string(), self.quote.instance_type.clone()),
        ])
    }
}

/// Queries one provider's pricing API for a single pair.
///
/// Implementations apply their own per-call timeout and never retry.
#[async_trait]
pub trait PriceQuoteClient: Send + Sync {
    /// Whether this client can price `provider` at all
    fn supports(&self, provider: Provider) -> bool;

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> Result<PriceQuote, QuoteError>;
}
