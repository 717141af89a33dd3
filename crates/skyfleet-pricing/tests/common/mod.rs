//! Scripted quote clients and capacity signals

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use skyfleet_cloud::{
    CapacitySignal, Currency, PriceQuote, PriceQuoteClient, Provider, QuoteError,
    RegionAvailability,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers quotes from a fixed `(region, instance type)` table
pub struct ScriptedQuotes {
    provider: Provider,
    currency: Currency,
    prices: HashMap<(String, String), Result<Decimal, QuoteError>>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedQuotes {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            currency: provider.native_currency(),
            prices: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn price(mut self, region: &str, instance_type: &str, price: Decimal) -> Self {
        self.prices
            .insert((region.to_string(), instance_type.to_string()), Ok(price));
        self
    }

    pub fn error(mut self, region: &str, instance_type: &str, error: QuoteError) -> Self {
        self.prices
            .insert((region.to_string(), instance_type.to_string()), Err(error));
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceQuoteClient for ScriptedQuotes {
    fn supports(&self, provider: Provider) -> bool {
        provider == self.provider
    }

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> Result<PriceQuote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.prices.get(&(region.to_string(), instance_type.to_string())) {
            Some(Ok(price)) => Ok(PriceQuote::new(provider, region, instance_type, *price, self.currency)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(QuoteError::NotFound(format!("{}/{}", region, instance_type))),
        }
    }
}

/// Answers probes from a fixed per-region table
pub struct ScriptedCapacity {
    provider: Provider,
    regions: HashMap<String, Result<Vec<(String, bool)>, QuoteError>>,
    slow_regions: Vec<String>,
    pub probed: Mutex<Vec<String>>,
}

impl ScriptedCapacity {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            regions: HashMap::new(),
            slow_regions: Vec::new(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn selling(mut self, region: &str, instance_type: &str, available: bool) -> Self {
        if let Ok(entries) = self
            .regions
            .entry(region.to_string())
            .or_insert_with(|| Ok(Vec::new()))
        {
            entries.push((instance_type.to_string(), available));
        }
        self
    }

    pub fn failing(mut self, region: &str) -> Self {
        self.regions.insert(
            region.to_string(),
            Err(QuoteError::Transient("connection reset".to_string())),
        );
        self
    }

    pub fn slow(mut self, region: &str) -> Self {
        self.slow_regions.push(region.to_string());
        self
    }
}

#[async_trait]
impl CapacitySignal for ScriptedCapacity {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn probe(
        &self,
        region: &str,
        _instance_family: &str,
    ) -> Result<Vec<RegionAvailability>, QuoteError> {
        self.probed.lock().unwrap().push(region.to_string());
        if self.slow_regions.iter().any(|r| r == region) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        match self.regions.get(region) {
            Some(Ok(entries)) => Ok(entries
                .iter()
                .map(|(instance_type, available)| RegionAvailability::new(region, instance_type, *available))
                .collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }
}
