//! Scripted provisioning engine and test project helpers

#![allow(dead_code)]

use async_trait::async_trait;
use skyfleet_cloud::{
    CapacitySignal, CredentialSet, FileScenarioStore, PriceQuote, PriceQuoteClient, Provider,
    QuoteError, RegionAvailability, Scenario, ScenarioStore, StaticCredentialStore,
};
use skyfleet_deploy::DeploymentOrchestrator;
use skyfleet_terraform::{
    EngineContext, EngineError, EngineErrorKind, EngineVars, Operation, ProvisioningEngine,
    ResourceDetail,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One recorded engine call
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Operation,
    pub dir: PathBuf,
    pub vars: EngineVars,
    pub env_names: Vec<String>,
    pub env_values: Vec<String>,
}

impl Call {
    pub fn region(&self) -> Option<&str> {
        self.vars.get("region").map(String::as_str)
    }
}

/// Engine with per-region node capacity. Regions not configured have none.
#[derive(Default)]
pub struct FakeEngine {
    capacity: Mutex<HashMap<String, u32>>,
    failures: HashMap<String, EngineErrorKind>,
    block_apply: bool,
    leaves_residue: bool,
    state: Mutex<HashMap<PathBuf, Vec<String>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(self, region: &str, nodes: u32) -> Self {
        self.capacity.lock().unwrap().insert(region.to_string(), nodes);
        self
    }

    pub fn failing(mut self, region: &str, kind: EngineErrorKind) -> Self {
        self.failures.insert(region.to_string(), kind);
        self
    }

    /// Apply waits for cancellation
    pub fn blocking(mut self) -> Self {
        self.block_apply = true;
        self
    }

    /// Failed applies keep a network resource in state, like a real partial apply
    pub fn leaves_residue(mut self) -> Self {
        self.leaves_residue = true;
        self
    }

    /// Resources currently tracked for `dir`
    pub fn state_of(&self, dir: &Path) -> Vec<String> {
        self.state.lock().unwrap().get(dir).cloned().unwrap_or_default()
    }

    fn keep_residue(&self, dir: &Path) {
        if self.leaves_residue {
            self.state
                .lock()
                .unwrap()
                .insert(dir.to_path_buf(), vec!["tencentcloud_vpc.main".to_string()]);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, op: Operation) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    /// Regions of every apply, in order
    pub fn applied_regions(&self) -> Vec<String> {
        self.calls_of(Operation::Apply)
            .iter()
            .map(|c| c.region().unwrap_or("-").to_string())
            .collect()
    }

    fn record(&self, op: Operation, ctx: &EngineContext, vars: &EngineVars) {
        self.calls.lock().unwrap().push(Call {
            op,
            dir: ctx.working_dir.clone(),
            vars: vars.clone(),
            env_names: ctx.env.names().map(str::to_string).collect(),
            env_values: ctx.env.iter().map(|(_, v)| v.to_string()).collect(),
        });
    }
}

#[async_trait]
impl ProvisioningEngine for FakeEngine {
    async fn init(&self, ctx: &EngineContext) -> skyfleet_terraform::Result<()> {
        self.record(Operation::Init, ctx, &EngineVars::new());
        Ok(())
    }

    async fn validate(&self, ctx: &EngineContext) -> skyfleet_terraform::Result<()> {
        self.record(Operation::Validate, ctx, &EngineVars::new());
        Ok(())
    }

    async fn plan(&self, ctx: &EngineContext, vars: &EngineVars) -> skyfleet_terraform::Result<()> {
        self.record(Operation::Plan, ctx, vars);
        Ok(())
    }

    async fn apply(
        &self,
        ctx: &EngineContext,
        _auto_approve: bool,
        vars: &EngineVars,
    ) -> skyfleet_terraform::Result<()> {
        self.record(Operation::Apply, ctx, vars);
        if self.block_apply {
            ctx.cancel.cancelled().await;
            return Err(EngineError::Cancelled(Operation::Apply));
        }

        let region = vars.get("region").cloned().unwrap_or_default();
        if let Some(kind) = self.failures.get(&region) {
            self.keep_residue(&ctx.working_dir);
            return Err(EngineError::Failed {
                operation: Operation::Apply,
                kind: *kind,
                message: format!("scripted failure in {}", region),
            });
        }

        let nodes: u32 = vars
            .get("node_count")
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        let mut capacity = self.capacity.lock().unwrap();
        let free = capacity.entry(region.clone()).or_insert(0);
        if *free < nodes {
            self.keep_residue(&ctx.working_dir);
            return Err(EngineError::Failed {
                operation: Operation::Apply,
                kind: EngineErrorKind::QuotaExceeded,
                message: "LimitExceeded.SpotQuota: spot quota exceeded".to_string(),
            });
        }
        *free -= nodes;

        let resources = (0..nodes)
            .map(|i| format!("tencentcloud_instance.node[{}]", i))
            .collect();
        self.state
            .lock()
            .unwrap()
            .insert(ctx.working_dir.clone(), resources);
        Ok(())
    }

    async fn destroy(
        &self,
        ctx: &EngineContext,
        _auto_approve: bool,
        vars: &EngineVars,
    ) -> skyfleet_terraform::Result<()> {
        self.record(Operation::Destroy, ctx, vars);
        self.state.lock().unwrap().remove(&ctx.working_dir);
        Ok(())
    }

    async fn state_list(&self, ctx: &EngineContext) -> skyfleet_terraform::Result<Vec<String>> {
        self.record(Operation::StateList, ctx, &EngineVars::new());
        Ok(self
            .state
            .lock()
            .unwrap()
            .get(&ctx.working_dir)
            .cloned()
            .unwrap_or_default())
    }

    async fn show_resources(
        &self,
        ctx: &EngineContext,
    ) -> skyfleet_terraform::Result<Vec<ResourceDetail>> {
        self.record(Operation::Show, ctx, &EngineVars::new());
        let state = self.state.lock().unwrap();
        Ok(state
            .get(&ctx.working_dir)
            .map(|resources| {
                resources
                    .iter()
                    .enumerate()
                    .map(|(i, address)| ResourceDetail {
                        address: address.clone(),
                        id: format!("ins-{}", i),
                        region: "ap-shanghai".to_string(),
                        kind: "tencentcloud_instance".to_string(),
                        instance_type: Some("S5.SMALL1".to_string()),
                        status: "RUNNING".to_string(),
                        public_ips: vec![format!("203.0.113.{}", i + 1)],
                        private_ips: vec![format!("10.0.0.{}", i + 1)],
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Fixed prices per `(region, instance type)`
pub struct FixedQuotes {
    pub provider: Provider,
    pub prices: Vec<(&'static str, &'static str, rust_decimal::Decimal)>,
}

#[async_trait]
impl PriceQuoteClient for FixedQuotes {
    fn supports(&self, provider: Provider) -> bool {
        provider == self.provider
    }

    async fn quote(
        &self,
        provider: Provider,
        region: &str,
        instance_type: &str,
    ) -> Result<PriceQuote, QuoteError> {
        self.prices
            .iter()
            .find(|(r, t, _)| *r == region && *t == instance_type)
            .map(|(_, _, price)| {
                PriceQuote::new(provider, region, instance_type, *price, provider.native_currency())
            })
            .ok_or_else(|| QuoteError::NotFound(region.to_string()))
    }
}

/// Sells spot capacity only in the listed regions
pub struct SellingIn {
    pub provider: Provider,
    pub regions: Vec<&'static str>,
}

#[async_trait]
impl CapacitySignal for SellingIn {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn probe(
        &self,
        region: &str,
        instance_family: &str,
    ) -> Result<Vec<RegionAvailability>, QuoteError> {
        let available = self.regions.contains(&region);
        Ok(vec![RegionAvailability::new(
            region,
            format!("{}.SMALL1", instance_family),
            available,
        )])
    }
}

/// Temporary project with a scenario store and template files
pub struct TestProject {
    pub dir: TempDir,
    pub store: Arc<FileScenarioStore>,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileScenarioStore::new(dir.path()));
        Self { dir, store }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Insert a scenario whose working directory holds a `main.tf`
    pub async fn scenario(&self, name: &str, template: &str) -> Scenario {
        self.insert(Scenario::new(name, template, self.root().join(name))).await
    }

    pub async fn insert(&self, scenario: Scenario) -> Scenario {
        std::fs::create_dir_all(&scenario.working_dir).unwrap();
        std::fs::write(scenario.working_dir.join("main.tf"), "# template").unwrap();
        self.store.insert(scenario.clone()).await.unwrap();
        scenario
    }

    pub async fn reload(&self, scenario: &Scenario) -> Scenario {
        self.store.get(&scenario.id).await.unwrap()
    }

    pub fn orchestrator(&self, engine: Arc<FakeEngine>) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(engine, self.store.clone(), Arc::new(credentials()))
    }
}

pub fn credentials() -> StaticCredentialStore {
    StaticCredentialStore::new()
        .with(Provider::Aliyun, CredentialSet::new("LTAIaccess", "aliyun-secret"))
        .with(Provider::Tencent, CredentialSet::new("AKIDaccess", "tencent-secret"))
}
