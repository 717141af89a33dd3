//! Cheapest-configuration selection
//!
//! The optimizer expands the candidate lists into `(region, instance type)`
//! pairs, quotes every pair through the shared [`FanOut`] pool and ranks the
//! successful quotes by hourly price in the reference currency of its
//! [`ConversionTable`]. Pairs that fail or time out simply drop out of the
//! ranking; only missing credentials stop a single-provider round early.

use crate::cache::QuoteCache;
use crate::currency::ConversionTable;
use crate::error::{OptimizeError, Result};
use skyfleet_cloud::{
    CancellationToken, FanOut, OptimalConfig, PriceQuoteClient, Provider, QuoteError, TaskOutcome,
    TemplateRef,
};
use std::sync::Arc;

/// One `(provider, region, instance type)` to quote
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub provider: Provider,
    pub region: String,
    pub instance_type: String,
}

/// Candidate lists for one provider; empty lists mean provider defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTarget {
    pub provider: Provider,
    pub instance_types: Vec<String>,
    pub regions: Vec<String>,
}

impl PriceTarget {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            instance_types: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn with_instance_types(mut self, instance_types: Vec<String>) -> Self {
        self.instance_types = instance_types;
        self
    }

    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    /// Sorted, de-duplicated pairs so rankings are reproducible
    pub fn candidates(&self) -> Vec<Candidate> {
        let instance_types = or_defaults(&self.instance_types, self.provider.default_instance_types());
        let regions = or_defaults(&self.regions, self.provider.default_regions());

        let mut candidates: Vec<Candidate> = regions
            .iter()
            .flat_map(|region| {
                instance_types.iter().map(move |instance_type| Candidate {
                    provider: self.provider,
                    region: region.clone(),
                    instance_type: instance_type.clone(),
                })
            })
            .collect();
        candidates.sort();
        candidates.dedup();
        candidates
    }
}

fn or_defaults(values: &[String], defaults: &[&str]) -> Vec<String> {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        defaults.iter().map(|d| d.to_string()).collect()
    } else {
        values
    }
}

pub struct PriceOptimizer {
    client: Arc<dyn PriceQuoteClient>,
    fan_out: FanOut,
    conversion: ConversionTable,
    cache: QuoteCache,
}

impl PriceOptimizer {
    pub fn new(client: Arc<dyn PriceQuoteClient>) -> Self {
        Self {
            client,
            fan_out: FanOut::default(),
            conversion: ConversionTable::default(),
            cache: QuoteCache::default(),
        }
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionTable) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_cache(mut self, cache: QuoteCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn conversion(&self) -> &ConversionTable {
        &self.conversion
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Cheapest quote for `provider` over the candidate lists
    pub async fn find_optimal(
        &self,
        provider: Provider,
        instance_types: &[String],
        regions: &[String],
        cancel: &CancellationToken,
    ) -> Result<OptimalConfig> {
        let ranked = self.rank(provider, instance_types, regions, cancel).await?;
        let best = first(ranked, &[provider])?;
        tracing::info!(
            provider = %provider,
            region = %best.region(),
            instance_type = %best.instance_type(),
            price_per_hour = %best.price_per_hour(),
            "optimal configuration selected"
        );
        Ok(best)
    }

    /// Every successful quote, cheapest first
    pub async fn rank(
        &self,
        provider: Provider,
        instance_types: &[String],
        regions: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<OptimalConfig>> {
        if !self.client.supports(provider) {
            return Err(OptimizeError::Unsupported(provider));
        }
        let target = PriceTarget::new(provider)
            .with_instance_types(instance_types.to_vec())
            .with_regions(regions.to_vec());
        self.rank_candidates(target.candidates(), &[provider], true, cancel)
            .await
    }

    /// Cheapest quote across several providers.
    ///
    /// Providers without a client are skipped and missing credentials only
    /// drop that provider's pairs.
    pub async fn find_optimal_across(
        &self,
        targets: &[PriceTarget],
        cancel: &CancellationToken,
    ) -> Result<OptimalConfig> {
        let providers: Vec<Provider> = targets.iter().map(|t| t.provider).collect();
        let mut candidates = Vec::new();
        for target in targets {
            if self.client.supports(target.provider) {
                candidates.extend(target.candidates());
            } else {
                tracing::warn!(provider = %target.provider, "no quote client, skipping provider");
            }
        }
        let ranked = self
            .rank_candidates(candidates, &providers, false, cancel)
            .await?;
        first(ranked, &providers)
    }

    /// [`find_optimal`](Self::find_optimal) behind the `(provider, template)` cache
    pub async fn find_optimal_for_template(
        &self,
        template: &TemplateRef,
        instance_types: &[String],
        regions: &[String],
        cancel: &CancellationToken,
    ) -> Result<OptimalConfig> {
        let provider = template
            .provider()
            .ok_or_else(|| OptimizeError::UnknownTemplate(template.to_string()))?;

        if let Some(cached) = self.cache.get(provider, template) {
            tracing::debug!(template = %template, "quote cache hit");
            return Ok(cached);
        }

        let config = self
            .find_optimal(provider, instance_types, regions, cancel)
            .await?;
        self.cache.insert(provider, template.clone(), config.clone());
        Ok(config)
    }

    async fn rank_candidates(
        &self,
        candidates: Vec<Candidate>,
        providers: &[Provider],
        auth_is_fatal: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<OptimalConfig>> {
        let attempted = candidates.len();
        let client = &self.client;
        tracing::debug!(candidates = attempted, "quoting candidates");

        let outcomes = self
            .fan_out
            .run(candidates.iter().cloned(), cancel, |candidate| async move {
                client
                    .quote(candidate.provider, &candidate.region, &candidate.instance_type)
                    .await
            })
            .await;

        if cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let mut ranked: Vec<(usize, OptimalConfig)> = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes {
            let candidate = &candidates[index];
            match outcome {
                TaskOutcome::Finished(Ok(quote)) => {
                    match self.conversion.normalize(quote.price_per_hour, quote.currency) {
                        Some(normalized) => ranked.push((
                            index,
                            OptimalConfig {
                                quote,
                                normalized_price_per_hour: normalized,
                                reference_currency: self.conversion.reference(),
                            },
                        )),
                        None => tracing::warn!(
                            currency = %quote.currency,
                            reference = %self.conversion.reference(),
                            "no conversion rate, dropping quote"
                        ),
                    }
                }
                TaskOutcome::Finished(Err(QuoteError::AuthMissing(provider))) if auth_is_fatal => {
                    return Err(OptimizeError::AuthMissing(provider));
                }
                TaskOutcome::Finished(Err(e)) => tracing::warn!(
                    provider = %candidate.provider,
                    region = %candidate.region,
                    instance_type = %candidate.instance_type,
                    error = %e,
                    "quote dropped"
                ),
                TaskOutcome::TimedOut => tracing::warn!(
                    provider = %candidate.provider,
                    region = %candidate.region,
                    instance_type = %candidate.instance_type,
                    "quote timed out"
                ),
            }
        }

        if ranked.is_empty() {
            return Err(OptimizeError::NoQuotesAvailable {
                providers: providers.to_vec(),
                attempted,
            });
        }

        ranked.sort_by(|(ia, a), (ib, b)| {
            a.normalized_price_per_hour
                .cmp(&b.normalized_price_per_hour)
                .then(ia.cmp(ib))
        });
        Ok(ranked.into_iter().map(|(_, config)| config).collect())
    }
}

fn first(ranked: Vec<OptimalConfig>, providers: &[Provider]) -> Result<OptimalConfig> {
    ranked
        .into_iter()
        .next()
        .ok_or_else(|| OptimizeError::NoQuotesAvailable {
            providers: providers.to_vec(),
            attempted: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_sorted_and_deduped() {
        let target = PriceTarget::new(Provider::Aliyun)
            .with_instance_types(vec!["b".into(), "a".into(), "a".into()])
            .with_regions(vec!["cn-shanghai".into(), "cn-beijing".into()]);
        let pairs: Vec<(String, String)> = target
            .candidates()
            .into_iter()
            .map(|c| (c.region, c.instance_type))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("cn-beijing".to_string(), "a".to_string()),
                ("cn-beijing".to_string(), "b".to_string()),
                ("cn-shanghai".to_string(), "a".to_string()),
                ("cn-shanghai".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_lists_use_provider_defaults() {
        let candidates = PriceTarget::new(Provider::Aliyun).candidates();
        let expected = Provider::Aliyun.default_regions().len()
            * Provider::Aliyun.default_instance_types().len();
        assert_eq!(candidates.len(), expected);
        assert!(candidates.iter().any(|c| c.region == "cn-shanghai"
            && c.instance_type == "ecs.t5-lc1m1.small"));
    }

    #[test]
    fn test_blank_entries_are_ignored() {
        let target = PriceTarget::new(Provider::Tencent).with_regions(vec!["  ".into()]);
        let regions: Vec<String> = target.candidates().into_iter().map(|c| c.region).collect();
        assert!(regions.contains(&"ap-nanjing".to_string()));
    }
}
