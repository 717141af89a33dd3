//! CapacityProbe integration tests

mod common;

use common::ScriptedCapacity;
use skyfleet_cloud::{CancellationToken, FanOut, Provider, RegionAvailability};
use skyfleet_pricing::CapacityProbe;
use std::sync::Arc;
use std::time::Duration;

fn list(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_failed_and_slow_regions_are_unavailable() {
    let signal = ScriptedCapacity::new(Provider::Tencent)
        .selling("ap-shanghai", "S5.SMALL1", false)
        .selling("ap-nanjing", "S5.SMALL1", true)
        .failing("ap-guangzhou")
        .slow("ap-beijing");
    let probe = CapacityProbe::new(FanOut::new(5, Duration::from_millis(50))).with(Arc::new(signal));
    let candidates = list(&["ap-shanghai", "ap-nanjing", "ap-guangzhou", "ap-beijing"]);

    let found = probe
        .find_available_regions(Provider::Tencent, "S5", &candidates, &CancellationToken::new())
        .await;

    assert!(found.contains(&RegionAvailability::new("ap-nanjing", "S5.SMALL1", true)));
    assert!(found.contains(&RegionAvailability::new("ap-guangzhou", "S5", false)));
    assert!(found.contains(&RegionAvailability::new("ap-beijing", "S5", false)));

    let pruned = probe
        .available_candidates(Provider::Tencent, "S5", &candidates, &CancellationToken::new())
        .await;
    assert_eq!(pruned, list(&["ap-nanjing"]));
}

#[tokio::test]
async fn test_no_information_is_empty_and_keeps_all_candidates() {
    let signal = ScriptedCapacity::new(Provider::Tencent)
        .failing("ap-shanghai")
        .failing("ap-nanjing");
    let probe = CapacityProbe::default().with(Arc::new(signal));
    let candidates = list(&["ap-shanghai", "ap-nanjing"]);

    let found = probe
        .find_available_regions(Provider::Tencent, "S5", &candidates, &CancellationToken::new())
        .await;
    assert!(found.is_empty());

    let pruned = probe
        .available_candidates(Provider::Tencent, "S5", &candidates, &CancellationToken::new())
        .await;
    assert_eq!(pruned, candidates);
}

#[tokio::test]
async fn test_provider_without_signal() {
    let probe = CapacityProbe::default();
    assert!(!probe.supports(Provider::Aws));
    let found = probe
        .find_available_regions(Provider::Aws, "t3", &list(&["us-east-1"]), &CancellationToken::new())
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_empty_candidates_probe_default_regions() {
    let signal = Arc::new(ScriptedCapacity::new(Provider::Tencent));
    let probe = CapacityProbe::default().with(signal.clone());

    probe
        .find_available_regions(Provider::Tencent, "", &[], &CancellationToken::new())
        .await;

    let mut probed = signal.probed.lock().unwrap().clone();
    probed.sort();
    let mut expected = list(Provider::Tencent.default_regions());
    expected.sort();
    assert_eq!(probed, expected);
}
