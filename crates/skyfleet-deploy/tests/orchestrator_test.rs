//! DeploymentOrchestrator integration tests

mod common;

use common::{FakeEngine, FixedQuotes, SellingIn, TestProject};
use rust_decimal_macros::dec;
use skyfleet_cloud::{
    CancellationToken, CloudError, CredentialSet, Provider, Scenario, ScenarioStatus,
    ScenarioStore, StaticCredentialStore,
};
use skyfleet_deploy::{
    AttemptOutcome, DeployError, DeployOptions, DeployRequest, DeploymentOrchestrator,
};
use skyfleet_pricing::{CapacityProbe, PriceOptimizer};
use skyfleet_terraform::{EngineErrorKind, Operation};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const TENCENT_FIVE: [&str; 5] = ["ap-shanghai", "ap-nanjing", "ap-guangzhou", "ap-beijing", "ap-chengdu"];

fn tencent_engine(with_capacity: &[&str]) -> FakeEngine {
    with_capacity
        .iter()
        .fold(FakeEngine::new(), |engine, region| engine.capacity(region, 1))
}

#[tokio::test]
async fn test_failover_follows_candidate_order() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-hangzhou", 1));
    let orchestrator = project.orchestrator(engine.clone());

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.applied_regions(), vec!["cn-beijing", "cn-shanghai", "cn-hangzhou"]);
    assert_eq!(report.attempted_regions(), vec!["cn-beijing", "cn-shanghai", "cn-hangzhou"]);
    assert!(matches!(report.attempts[0].outcome, AttemptOutcome::QuotaExceeded(_)));
    assert_eq!(report.attempts[2].outcome, AttemptOutcome::Placed);
    assert_eq!(report.placements.len(), 1);
    assert_eq!(report.placements[0].region, "cn-hangzhou");

    let stored = project.reload(&scenario).await;
    assert_eq!(stored.status, ScenarioStatus::Deployed);
    assert_eq!(stored.placement.unwrap().region, "cn-hangzhou");
}

#[tokio::test]
async fn test_fragments_four_nodes_across_four_regions() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone());

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.fragmented);
    assert_eq!(report.placed(), 4);
    let regions: BTreeSet<&str> = report.placements.iter().map(|p| p.region.as_str()).collect();
    assert_eq!(regions.len(), 4);
    assert!(!regions.contains("ap-chengdu"));

    // The whole request was tried once before splitting
    let applies = engine.calls_of(Operation::Apply);
    assert_eq!(applies[0].vars.get("node_count").map(String::as_str), Some("4"));
    assert!(applies[1..].iter().all(|c| c.vars.get("node_count").map(String::as_str) == Some("1")));

    let stored = project.reload(&scenario).await;
    assert_eq!(stored.status, ScenarioStatus::Deployed);
    assert_eq!(stored.fragments.len(), 4);
    assert_eq!(stored.placed_nodes(), 4);
    for fragment in &stored.fragments {
        assert_eq!(
            fragment.working_dir,
            scenario.working_dir.join("fragments").join(&fragment.region)
        );
        assert!(fragment.working_dir.join("main.tf").exists());
    }
}

#[tokio::test]
async fn test_fragments_short_of_request_stay_pending() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&["ap-shanghai", "ap-nanjing", "ap-guangzhou"]));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &cancel)
        .await
        .unwrap_err();

    let DeployError::Partial { report } = &err else {
        panic!("expected partial placement, got {err}");
    };
    assert_eq!(report.placed(), 3);
    assert_eq!(report.requested, 4);
    assert!(report.to_string().starts_with("3 of 4 requested nodes placed"));
    assert!(err.left_partial_placement());

    let stored = project.reload(&scenario).await;
    assert_eq!(stored.status, ScenarioStatus::Pending);
    assert_eq!(stored.fragments.len(), 3);

    // A blind retry is refused until the fragments are cleaned up
    let retry = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(retry, DeployError::NeedsCleanup { placed: 3, .. }));

    let removed = orchestrator.cleanup(&scenario.id, None, &cancel).await.unwrap();
    assert_eq!(removed.len(), 3);
    assert_eq!(engine.calls_of(Operation::Destroy).len(), 3);

    let stored = project.reload(&scenario).await;
    assert_eq!(stored.status, ScenarioStatus::Pending);
    assert!(stored.fragments.is_empty());
}

#[tokio::test]
async fn test_parallel_fragments_place_every_node() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone()).with_options(DeployOptions {
        fragment_parallelism: 3,
        ..DeployOptions::default()
    });

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.placed(), 4);
    let dirs: BTreeSet<_> = report.placements.iter().map(|p| p.working_dir.clone()).collect();
    assert_eq!(dirs.len(), 4);
}

#[tokio::test]
async fn test_other_engine_error_aborts() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(
        FakeEngine::new()
            .failing("cn-beijing", EngineErrorKind::Other)
            .capacity("cn-shanghai", 1),
    );
    let orchestrator = project.orchestrator(engine.clone());

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Engine { .. }));
    assert_eq!(err.report().unwrap().attempts.len(), 1);
    assert_eq!(engine.applied_regions(), vec!["cn-beijing"]);
    assert_eq!(project.reload(&scenario).await.status, ScenarioStatus::Pending);
}

#[tokio::test]
async fn test_every_region_out_of_quota() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new());
    let orchestrator = project.orchestrator(engine.clone());

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    let report = err.report().unwrap();
    assert!(matches!(err, DeployError::QuotaExhausted { .. }));
    assert_eq!(report.attempts.len(), Provider::Aliyun.default_regions().len());
    assert_eq!(report.placed(), 0);
    assert!(!err.left_partial_placement());
}

#[tokio::test]
async fn test_postpaid_proxy_never_fragments() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy-postpaid").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone());

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(3), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::QuotaExhausted { .. }));
    assert!(!err.report().unwrap().fragmented);
    assert!(
        engine
            .calls_of(Operation::Apply)
            .iter()
            .all(|c| c.vars.get("node_count").map(String::as_str) == Some("3"))
    );
    assert!(project.reload(&scenario).await.fragments.is_empty());
}

#[tokio::test]
async fn test_region_scoped_template_wins_conflict() {
    let project = TestProject::new();
    let scenario = project
        .scenario("sh", "aliyun/aliyun-proxy/zone-node/ss-libev-node-sh")
        .await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-shanghai", 2).capacity("cn-beijing", 2));
    let orchestrator = project.orchestrator(engine.clone());

    orchestrator
        .deploy(
            &scenario.id,
            &DeployRequest::new().with_region("cn-beijing").with_nodes(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let applies = engine.calls_of(Operation::Apply);
    assert_eq!(applies.len(), 1);
    assert_eq!(applies[0].region(), Some("cn-shanghai"));
    assert_eq!(applies[0].vars.get("node_count").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_scenario_region_is_the_only_candidate() {
    let project = TestProject::new();
    let scenario = project
        .insert(Scenario::new("web", "aliyun/ecs", project.root().join("web")).with_region("cn-shenzhen"))
        .await;
    let engine = Arc::new(FakeEngine::new());
    let orchestrator = project.orchestrator(engine.clone());

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_region("cn-beijing"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::QuotaExhausted { .. }));
    assert_eq!(engine.applied_regions(), vec!["cn-shenzhen"]);
}

#[tokio::test]
async fn test_explicit_region_goes_first() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_region("cn-shenzhen"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.applied_regions(), vec!["cn-shenzhen", "cn-beijing"]);
}

#[tokio::test]
async fn test_credential_region_goes_first() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-hangzhou", 1));
    let credentials = StaticCredentialStore::new().with(
        Provider::Aliyun,
        CredentialSet::new("LTAIaccess", "aliyun-secret").with_region("cn-hangzhou"),
    );
    let orchestrator =
        DeploymentOrchestrator::new(engine.clone(), project.store.clone(), Arc::new(credentials));

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.applied_regions(), vec!["cn-hangzhou"]);
}

#[tokio::test]
async fn test_secrets_travel_only_in_env() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone());

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(2), &CancellationToken::new())
        .await
        .unwrap();

    for call in engine.calls_of(Operation::Apply) {
        assert!(call.env_names.contains(&"TENCENTCLOUD_SECRET_ID".to_string()));
        assert!(call.env_names.contains(&"TF_VAR_tencentcloud_secret_key".to_string()));
        assert!(call.env_values.contains(&"tencent-secret".to_string()));
        assert!(call.vars.values().all(|v| v != "tencent-secret" && v != "AKIDaccess"));
    }
}

#[tokio::test]
async fn test_missing_credentials_stop_before_engine() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = DeploymentOrchestrator::new(
        engine.clone(),
        project.store.clone(),
        Arc::new(StaticCredentialStore::new()),
    );

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::AuthMissing(Provider::Tencent)));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_template_runs_without_secrets() {
    let project = TestProject::new();
    let scenario = project.scenario("custom", "nowhere/thing").await;
    let engine = Arc::new(FakeEngine::new().capacity("", 1));
    let orchestrator = project.orchestrator(engine.clone());

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.placed(), 1);
    let applies = engine.calls_of(Operation::Apply);
    assert_eq!(applies.len(), 1);
    assert!(applies[0].region().is_none());
    assert!(applies[0].env_names.is_empty());
}

#[tokio::test]
async fn test_fixed_template_ignores_node_count() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.requested, 1);
    assert!(!engine.calls_of(Operation::Apply)[0].vars.contains_key("node_count"));
}

#[tokio::test]
async fn test_default_node_count() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(FakeEngine::new().capacity("ap-shanghai", 3));
    let orchestrator = project.orchestrator(engine.clone());

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.requested, 3);
    assert!(!report.fragmented);
}

#[tokio::test]
async fn test_destroy_transitions() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let early = orchestrator.destroy(&scenario.id, None, &cancel).await.unwrap_err();
    assert!(matches!(
        early,
        DeployError::InvalidTransition { from: ScenarioStatus::Pending, to: ScenarioStatus::Destroyed, .. }
    ));

    orchestrator.deploy(&scenario.id, &DeployRequest::new(), &cancel).await.unwrap();
    let destroyed = orchestrator.destroy(&scenario.id, None, &cancel).await.unwrap();
    assert_eq!(destroyed.len(), 1);

    let destroy_call = &engine.calls_of(Operation::Destroy)[0];
    assert_eq!(destroy_call.region(), Some("cn-beijing"));
    assert_eq!(project.reload(&scenario).await.status, ScenarioStatus::Destroyed);

    let again = orchestrator.destroy(&scenario.id, None, &cancel).await.unwrap_err();
    assert!(matches!(again, DeployError::InvalidTransition { .. }));
    let redeploy = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(redeploy, DeployError::InvalidTransition { from: ScenarioStatus::Destroyed, .. }));
}

#[tokio::test]
async fn test_destroy_reaches_every_fragment() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &cancel)
        .await
        .unwrap();
    let destroyed = orchestrator.destroy(&scenario.id, None, &cancel).await.unwrap();

    assert_eq!(destroyed.len(), 4);
    let dirs: BTreeSet<_> = engine
        .calls_of(Operation::Destroy)
        .into_iter()
        .map(|c| c.dir)
        .collect();
    assert_eq!(dirs.len(), 4);
    assert!(dirs.iter().all(|d| d.starts_with(scenario.working_dir.join("fragments"))));
    assert_eq!(project.reload(&scenario).await.status, ScenarioStatus::Destroyed);
}

#[tokio::test]
async fn test_destroy_removes_what_the_full_size_apply_left() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE).leaves_residue());
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let report = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &cancel)
        .await
        .unwrap();
    assert!(report.fragmented);
    assert_eq!(engine.state_of(&scenario.working_dir), vec!["tencentcloud_vpc.main"]);

    let status = orchestrator.status(&scenario.id, &cancel).await.unwrap();
    assert!(status.resources.iter().any(|r| r == "tencentcloud_vpc.main"));

    let destroyed = orchestrator.destroy(&scenario.id, None, &cancel).await.unwrap();
    assert_eq!(destroyed.len(), 4);

    let destroys = engine.calls_of(Operation::Destroy);
    assert_eq!(destroys.len(), 5);
    let main = destroys
        .iter()
        .find(|c| c.dir == scenario.working_dir)
        .expect("scenario directory destroyed");
    assert_eq!(main.region(), Some("ap-shanghai"));
    assert_eq!(main.vars.get("node_count").map(String::as_str), Some("4"));
    assert!(engine.state_of(&scenario.working_dir).is_empty());
}

#[tokio::test]
async fn test_cleanup_after_partial_removes_leftovers() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&["ap-shanghai", "ap-nanjing", "ap-guangzhou"]).leaves_residue());
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(4), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Partial { .. }));

    // Three placed fragments plus the three whose apply failed after creating a vpc
    let stored = project.reload(&scenario).await;
    assert_eq!(stored.fragments.len(), 6);
    assert_eq!(stored.placed_nodes(), 3);
    assert!(stored.fragments.iter().any(|f| f.region == "ap-chongqing" && f.nodes == 0));

    let removed = orchestrator.cleanup(&scenario.id, None, &cancel).await.unwrap();
    assert_eq!(removed.len(), 6);
    let destroys = engine.calls_of(Operation::Destroy);
    assert_eq!(destroys.len(), 7);
    assert!(destroys.iter().any(|c| c.dir == scenario.working_dir));
    assert!(engine.state_of(&scenario.working_dir).is_empty());
    for fragment in &stored.fragments {
        assert!(engine.state_of(&fragment.working_dir).is_empty());
    }
}

#[tokio::test]
async fn test_cleanup_after_exhausted_failover() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().leaves_residue());
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::QuotaExhausted { .. }));

    // The variables of the last region tried are kept for the teardown
    let last = Provider::Aliyun.default_regions().last().copied();
    let stored = project.reload(&scenario).await;
    assert_eq!(stored.attempt_vars.get("region").map(String::as_str), last);

    let removed = orchestrator.cleanup(&scenario.id, None, &cancel).await.unwrap();
    assert!(removed.is_empty());
    let destroys = engine.calls_of(Operation::Destroy);
    assert_eq!(destroys.len(), 1);
    assert_eq!(destroys[0].dir, scenario.working_dir);
    assert_eq!(destroys[0].region(), last);
}

#[tokio::test]
async fn test_cleanup_requires_pending() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    assert!(orchestrator.cleanup(&scenario.id, None, &cancel).await.unwrap().is_empty());

    orchestrator.deploy(&scenario.id, &DeployRequest::new(), &cancel).await.unwrap();
    let err = orchestrator.cleanup(&scenario.id, None, &cancel).await.unwrap_err();
    assert!(matches!(err, DeployError::Unsupported(_)));
}

#[tokio::test]
async fn test_locked_scenario_is_refused() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());

    let held = project.store.lock(&scenario.id).await.unwrap();
    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Store(CloudError::LockError(_))));
    assert!(engine.calls().is_empty());

    held.release().await.unwrap();
    orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deploy_by_name() {
    let project = TestProject::new();
    project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine);

    let report = orchestrator
        .deploy("web", &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.placed(), 1);
}

#[tokio::test]
async fn test_cancelled_before_any_attempt() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-beijing", 1));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled { .. }));
    assert!(engine.calls_of(Operation::Apply).is_empty());
}

#[tokio::test]
async fn test_cancel_reaches_running_apply() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().blocking());
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &cancel)
        .await
        .unwrap_err();
    let report = err.report().unwrap();
    assert!(matches!(err, DeployError::Cancelled { .. }));
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Cancelled);
    assert_eq!(project.reload(&scenario).await.status, ScenarioStatus::Pending);
}

#[tokio::test]
async fn test_optimizer_orders_regions_by_price() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "aliyun/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("cn-hangzhou", 1));
    let quotes = FixedQuotes {
        provider: Provider::Aliyun,
        prices: vec![
            ("cn-beijing", "ecs.t5-lc1m1.small", dec!(0.08)),
            ("cn-shanghai", "ecs.t5-lc1m1.small", dec!(0.065)),
            ("cn-hangzhou", "ecs.t5-lc1m2.small", dec!(0.07)),
        ],
    };
    let orchestrator = project
        .orchestrator(engine.clone())
        .with_optimizer(Arc::new(PriceOptimizer::new(Arc::new(quotes))));

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_optimize(true), &CancellationToken::new())
        .await
        .unwrap();

    let applies = engine.calls_of(Operation::Apply);
    let regions: Vec<_> = applies.iter().map(|c| c.region().unwrap_or("-")).collect();
    assert_eq!(regions, vec!["cn-shanghai", "cn-hangzhou"]);
    assert_eq!(
        applies[1].vars.get("instance_type").map(String::as_str),
        Some("ecs.t5-lc1m2.small")
    );
}

#[tokio::test]
async fn test_probe_prunes_regions_without_capacity() {
    let project = TestProject::new();
    let scenario = project.scenario("web", "tencent/ecs").await;
    let engine = Arc::new(FakeEngine::new().capacity("ap-guangzhou", 1));
    let probe = CapacityProbe::default().with(Arc::new(SellingIn {
        provider: Provider::Tencent,
        regions: vec!["ap-guangzhou"],
    }));
    let orchestrator = project.orchestrator(engine.clone()).with_probe(Arc::new(probe));

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(engine.applied_regions(), vec!["ap-guangzhou"]);
}

#[tokio::test]
async fn test_status_report() {
    let project = TestProject::new();
    let scenario = project.scenario("proxy", "tencent/tencent-proxy").await;
    let engine = Arc::new(tencent_engine(&TENCENT_FIVE));
    let orchestrator = project.orchestrator(engine.clone());
    let cancel = CancellationToken::new();

    orchestrator
        .deploy(&scenario.id, &DeployRequest::new().with_nodes(2), &cancel)
        .await
        .unwrap();
    let status = orchestrator.status(&scenario.id, &cancel).await.unwrap();

    assert_eq!(status.scenario.status, ScenarioStatus::Deployed);
    assert_eq!(status.resources.len(), 2);
    assert_eq!(status.details.len(), 2);
    assert!(status.warnings.is_empty());
}
