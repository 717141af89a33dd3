//! DescribePrice quote client

use crate::error::{AliyunError, Result};
use crate::rpc::EcsClient;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use skyfleet_cloud::{
    CredentialSet, CredentialStore, Currency, PriceQuote, PriceQuoteClient, Provider, QuoteError,
};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DescribePriceResponse {
    #[serde(rename = "PriceInfo")]
    price_info: PriceInfo,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    #[serde(rename = "Price")]
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    #[serde(rename = "TradePrice", default)]
    trade_price: f64,
    #[serde(rename = "OriginalPrice", default)]
    original_price: f64,
    #[serde(rename = "DiscountPrice", default)]
    discount_price: f64,
    #[serde(rename = "Currency")]
    currency: Option<String>,
}

impl Price {
    /// First non-zero of trade, original, discount
    fn hourly(&self) -> Option<f64> {
        [self.trade_price, self.original_price, self.discount_price]
            .into_iter()
            .find(|p| *p > 0.0)
    }
}

/// Pay-as-you-go hourly prices for ECS instances
pub struct AliyunPriceClient {
    ecs: EcsClient,
    credentials: Arc<dyn CredentialStore>,
}

impl AliyunPriceClient {
    pub fn new(ecs: EcsClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { ecs, credentials }
    }

    fn credentials(&self) -> Result<CredentialSet> {
        self.credentials
            .credentials(Provider::Aliyun)
            .ok_or(AliyunError::MissingCredentials)
    }

    /// Hourly price of `instance_type` in `region`
    pub async fn describe_price(&self, region: &str, instance_type: &str) -> Result<PriceQuote> {
        let credentials = self.credentials()?;
        let response: DescribePriceResponse = self
            .ecs
            .call(
                &credentials,
                "DescribePrice",
                &[
                    ("RegionId", region),
                    ("ResourceType", "instance"),
                    ("InstanceType", instance_type),
                    ("PriceUnit", "Hour"),
                ],
            )
            .await?;

        let price = &response.price_info.price;
        let pair = format!("{}/{}", region, instance_type);
        let hourly = price
            .hourly()
            // Display of f64 is the shortest round-trip form, so 0.065 stays 0.065
            .and_then(|p| p.to_string().parse::<Decimal>().ok())
            .ok_or_else(|| AliyunError::NoPrice(pair.clone()))?;
        let currency = price
            .currency
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(Currency::Cny);

        tracing::debug!(pair = %pair, price = %hourly, currency = %currency, "DescribePrice");
        Ok(PriceQuote::new(
            Provider::Aliyun,
            region,
            instance_type,
            hourly.normalize(),
            currency,
        ))
    }

    /// Regions visible to the configured account
    pub async fn list_regions(&self) -> Result<Vec<String>> {
        let credentials = self.credentials()?;
        self.ecs.describe_regions(&credentials).await
    }
}

#[async_trait]
impl PriceQuoteClient for AliyunPriceClient {
    fn supports(&self, provider: Provider) -> bool {
        provider == Provider::Aliyun
    }

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> std::result::Result<PriceQuote, QuoteError> {
        if provider != Provider::Aliyun {
            return Err(QuoteError::Unsupported(format!(
                "Alibaba Cloud client cannot price {}",
                provider
            )));
        }
        self.describe_price(region, instance_type)
            .await
            .map_err(|e| e.to_quote_error())
    }
}
