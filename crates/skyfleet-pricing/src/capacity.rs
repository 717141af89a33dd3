//! Spot capacity probing across candidate regions

use skyfleet_cloud::{CancellationToken, CapacitySignal, FanOut, Provider, RegionAvailability, TaskOutcome};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Fans capacity signals out over regions.
///
/// Probing never fails: a region whose signal errors or times out is
/// recorded as unavailable, and when no region answered at all the result
/// is empty, which callers read as "no information".
pub struct CapacityProbe {
    signals: HashMap<Provider, Arc<dyn CapacitySignal>>,
    fan_out: FanOut,
}

impl Default for CapacityProbe {
    fn default() -> Self {
        Self::new(FanOut::default())
    }
}

impl CapacityProbe {
    pub fn new(fan_out: FanOut) -> Self {
        Self {
            signals: HashMap::new(),
            fan_out,
        }
    }

    pub fn with(mut self, signal: Arc<dyn CapacitySignal>) -> Self {
        self.register(signal);
        self
    }

    pub fn register(&mut self, signal: Arc<dyn CapacitySignal>) {
        self.signals.insert(signal.provider(), signal);
    }

    pub fn supports(&self, provider: Provider) -> bool {
        self.signals.contains_key(&provider)
    }

    pub async fn find_available_regions(
        &self,
        provider: Provider,
        instance_family: &str,
        candidate_regions: &[String],
        cancel: &CancellationToken,
    ) -> BTreeSet<RegionAvailability> {
        let Some(signal) = self.signals.get(&provider) else {
            tracing::debug!(provider = %provider, "no capacity signal");
            return BTreeSet::new();
        };

        let family = if instance_family.trim().is_empty() {
            provider.default_instance_family()
        } else {
            instance_family.trim()
        };
        let regions: Vec<String> = if candidate_regions.is_empty() {
            provider.default_regions().iter().map(|r| r.to_string()).collect()
        } else {
            candidate_regions.to_vec()
        };

        let outcomes = self
            .fan_out
            .run(regions.iter().cloned(), cancel, |region| async move {
                signal.probe(&region, family).await
            })
            .await;

        let mut found = BTreeSet::new();
        let mut unknown = Vec::new();
        for (index, outcome) in outcomes {
            let region = &regions[index];
            match outcome {
                TaskOutcome::Finished(Ok(entries)) => found.extend(entries),
                TaskOutcome::Finished(Err(e)) => {
                    tracing::warn!(provider = %provider, region = %region, error = %e, "capacity probe failed");
                    unknown.push(region.clone());
                }
                TaskOutcome::TimedOut => {
                    tracing::warn!(provider = %provider, region = %region, "capacity probe timed out");
                    unknown.push(region.clone());
                }
            }
        }

        if found.is_empty() {
            return found;
        }
        for region in unknown {
            found.insert(RegionAvailability::new(region, family, false));
        }
        found
    }

    /// Probe and prune in one step
    pub async fn available_candidates(
        &self,
        provider: Provider,
        instance_family: &str,
        candidate_regions: &[String],
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let found = self
            .find_available_regions(provider, instance_family, candidate_regions, cancel)
            .await;
        prune(candidate_regions, &found)
    }
}

/// Candidates with available capacity, in their original order.
///
/// Returns every candidate when the probe produced no positive signal.
pub fn prune(candidates: &[String], found: &BTreeSet<RegionAvailability>) -> Vec<String> {
    let available: BTreeSet<&str> = found
        .iter()
        .filter(|a| a.available)
        .map(|a| a.region.as_str())
        .collect();
    if available.is_empty() {
        return candidates.to_vec();
    }
    candidates
        .iter()
        .filter(|c| available.contains(c.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_prune_keeps_candidate_order() {
        let found = BTreeSet::from([
            RegionAvailability::new("ap-guangzhou", "S5.SMALL1", true),
            RegionAvailability::new("ap-nanjing", "S5.SMALL1", false),
            RegionAvailability::new("ap-nanjing", "S5.SMALL2", true),
            RegionAvailability::new("ap-shanghai", "S5.SMALL1", false),
        ]);
        let pruned = prune(&regions(&["ap-shanghai", "ap-nanjing", "ap-guangzhou"]), &found);
        assert_eq!(pruned, regions(&["ap-nanjing", "ap-guangzhou"]));
    }

    #[test]
    fn test_prune_without_information_keeps_all() {
        let candidates = regions(&["ap-shanghai", "ap-nanjing"]);
        assert_eq!(prune(&candidates, &BTreeSet::new()), candidates);

        let none_available = BTreeSet::from([RegionAvailability::new("ap-shanghai", "S5", false)]);
        assert_eq!(prune(&candidates, &none_available), candidates);
    }
}
