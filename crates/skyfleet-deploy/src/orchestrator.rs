//! Deployment orchestration
//!
//! A deploy walks an ordered list of candidate regions, one provisioning
//! run at a time, and stops at the first region that takes the whole
//! request. Quota failures move on to the next region; anything else
//! aborts. When a multi-node request hits a quota limit on an elastic
//! template the remaining regions are used for fragments instead, each in
//! its own working directory, until every node is placed or the regions
//! run out.
//!
//! ```text
//! pending ──deploy──▶ deploying ──▶ deployed ──destroy──▶ destroying ──▶ destroyed
//!                         │
//!                         └──▶ failed (stored as pending)
//! ```

use crate::error::{DeployError, Result};
use crate::fragment::{FragmentStrategy, UnitFragments, next_chunk};
use crate::report::{AttemptOutcome, DeployReport, StatusReport};
use crate::resolver::CredentialResolver;
use crate::workspace::{CopyWorkdir, WorkspacePreparer};
use futures_util::future::join_all;
use skyfleet_cloud::{
    CancellationToken, CredentialStore, Phase, Placement, Scenario, ScenarioLock, ScenarioStatus,
    ScenarioStore, TemplateKind,
};
use skyfleet_pricing::{CapacityProbe, PriceOptimizer, prune};
use skyfleet_terraform::{EngineContext, EngineError, EngineVars, ProvisioningEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Orchestrator-wide defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    pub auto_approve: bool,
    /// Fragments provisioned at once; 1 runs them strictly in order
    pub fragment_parallelism: usize,
    /// Node count for templates that accept one when the request has none
    pub default_node_count: u32,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            auto_approve: true,
            fragment_parallelism: 1,
            default_node_count: 3,
        }
    }
}

/// Per-call deploy parameters
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub node_count: Option<u32>,
    /// Tried first; ignored for region-scoped templates and scenarios
    /// created with a region
    pub region: Option<String>,
    pub instance_type: Option<String>,
    pub auto_approve: Option<bool>,
    /// Order regions by live price before attempting them
    pub optimize: bool,
    /// Extra non-secret template variables
    pub vars: EngineVars,
}

impl DeployRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, node_count: u32) -> Self {
        self.node_count = Some(node_count);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

/// One region to try, with the instance type chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    region: Option<String>,
    instance_type: Option<String>,
}

impl Target {
    fn label(&self) -> &str {
        self.region.as_deref().unwrap_or("template default")
    }

    fn vars(&self, base: &EngineVars) -> EngineVars {
        let mut vars = base.clone();
        if let Some(region) = &self.region {
            vars.insert("region".to_string(), region.clone());
        }
        if let Some(instance_type) = &self.instance_type {
            vars.insert("instance_type".to_string(), instance_type.clone());
        }
        vars
    }
}

enum Abort {
    Cancelled,
    Engine(EngineError),
}

pub struct DeploymentOrchestrator {
    engine: Arc<dyn ProvisioningEngine>,
    store: Arc<dyn ScenarioStore>,
    resolver: CredentialResolver,
    optimizer: Option<Arc<PriceOptimizer>>,
    probe: Option<Arc<CapacityProbe>>,
    fragments: Arc<dyn FragmentStrategy>,
    workspace: Arc<dyn WorkspacePreparer>,
    options: DeployOptions,
}

impl DeploymentOrchestrator {
    pub fn new(
        engine: Arc<dyn ProvisioningEngine>,
        store: Arc<dyn ScenarioStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            engine,
            store,
            resolver: CredentialResolver::new(credentials),
            optimizer: None,
            probe: None,
            fragments: Arc::new(UnitFragments),
            workspace: Arc::new(CopyWorkdir),
            options: DeployOptions::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<PriceOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn with_probe(mut self, probe: Arc<CapacityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_fragment_strategy(mut self, strategy: Arc<dyn FragmentStrategy>) -> Self {
        self.fragments = strategy;
        self
    }

    pub fn with_workspace(mut self, workspace: Arc<dyn WorkspacePreparer>) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_options(mut self, options: DeployOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// Provision a pending scenario
    pub async fn deploy(
        &self,
        key: &str,
        request: &DeployRequest,
        cancel: &CancellationToken,
    ) -> Result<DeployReport> {
        let (mut scenario, lock) = self.acquire(key).await?;
        let result = self.deploy_locked(&mut scenario, request, cancel).await;
        release(lock).await;
        result
    }

    /// Tear down a deployed scenario, fragments included
    pub async fn destroy(
        &self,
        key: &str,
        auto_approve: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Placement>> {
        let (mut scenario, lock) = self.acquire(key).await?;
        let result = self.destroy_locked(&mut scenario, auto_approve, cancel).await;
        release(lock).await;
        result
    }

    /// Destroy the fragments a failed deploy left behind.
    ///
    /// The scenario stays `pending` and can be deployed again afterwards.
    pub async fn cleanup(
        &self,
        key: &str,
        auto_approve: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Placement>> {
        let (mut scenario, lock) = self.acquire(key).await?;
        let result = self.cleanup_locked(&mut scenario, auto_approve, cancel).await;
        release(lock).await;
        result
    }

    /// Stored status plus whatever the engine reports, best effort
    pub async fn status(&self, key: &str, cancel: &CancellationToken) -> Result<StatusReport> {
        let scenario = self.store.get(key).await?;
        let env = self.resolver.resolve_available(scenario.kind.as_ref());
        let ctx = EngineContext::new(&scenario.working_dir, env, cancel.clone());

        let mut report = StatusReport {
            resources: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            scenario,
        };
        for dir in self.state_dirs(&report.scenario, &ctx).await {
            if !dir.exists() {
                continue;
            }
            let dir_ctx = ctx.in_dir(&dir);
            match self.engine.state_list(&dir_ctx).await {
                Ok(resources) => report.resources.extend(resources),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "state list failed");
                    report.warnings.push(format!("{}: {}", dir.display(), e));
                }
            }
            match self.engine.show_resources(&dir_ctx).await {
                Ok(details) => report.details.extend(details),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "show failed");
                    report.warnings.push(format!("{}: {}", dir.display(), e));
                }
            }
        }
        Ok(report)
    }

    async fn acquire(&self, key: &str) -> Result<(Scenario, ScenarioLock)> {
        let id = self.store.get(key).await?.id;
        let lock = self.store.lock(&id).await?;
        // Re-read under the lock so a concurrent writer's changes are seen
        match self.store.get(&id).await {
            Ok(scenario) => Ok((scenario, lock)),
            Err(e) => {
                release(lock).await;
                Err(e.into())
            }
        }
    }

    async fn deploy_locked(
        &self,
        scenario: &mut Scenario,
        request: &DeployRequest,
        cancel: &CancellationToken,
    ) -> Result<DeployReport> {
        if !scenario.status.can_transition_to(ScenarioStatus::Deployed) {
            return Err(DeployError::InvalidTransition {
                scenario: scenario.id.clone(),
                from: scenario.status,
                to: ScenarioStatus::Deployed,
            });
        }
        if !scenario.fragments.is_empty() {
            return Err(DeployError::NeedsCleanup {
                scenario: scenario.id.clone(),
                placed: scenario.placed_nodes(),
            });
        }

        let kind = scenario.kind.clone();
        let env = self.resolver.resolve(kind.as_ref())?;
        let nodes = self.node_count(kind.as_ref(), request);
        let targets = self.plan_targets(scenario, kind.as_ref(), request, cancel).await;

        let mut base_vars = request.vars.clone();
        if kind.as_ref().is_some_and(TemplateKind::accepts_node_count) {
            base_vars.insert("node_count".to_string(), nodes.to_string());
        }
        let auto_approve = request.auto_approve.unwrap_or(self.options.auto_approve);
        let ctx = EngineContext::new(&scenario.working_dir, env, cancel.clone());

        let mut report = DeployReport::new(&scenario.id, nodes);
        report.advance(Phase::Deploying);
        tracing::info!(
            scenario = %scenario.id,
            template = %scenario.template,
            nodes,
            candidates = targets.len(),
            "deploying"
        );

        for (index, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                report.advance(Phase::Failed);
                return Err(DeployError::Cancelled { report: Box::new(report) });
            }

            let vars = target.vars(&base_vars);
            scenario.attempt_vars = vars.clone();
            self.store.update(scenario).await?;
            tracing::info!(scenario = %scenario.id, region = %target.label(), nodes, "provisioning");
            let error = match self.provision(&ctx, auto_approve, &vars).await {
                Ok(()) => {
                    report.record(target.region.as_deref(), nodes, false, AttemptOutcome::Placed);
                    let placement = Placement {
                        region: target.label().to_string(),
                        nodes,
                        working_dir: scenario.working_dir.clone(),
                        vars,
                    };
                    report.placements.push(placement.clone());
                    scenario.placement = Some(placement);
                    return self.finish_deploy(scenario, report, &ctx).await;
                }
                Err(error) => error,
            };

            let outcome = AttemptOutcome::from_error(&error);
            report.record(target.region.as_deref(), nodes, false, outcome.clone());
            match outcome {
                AttemptOutcome::QuotaExceeded(_) => {
                    tracing::warn!(scenario = %scenario.id, region = %target.label(), "quota exceeded");
                    if nodes > 1 && kind.as_ref().is_some_and(TemplateKind::can_fragment) {
                        tracing::info!(
                            scenario = %scenario.id,
                            strategy = self.fragments.name(),
                            "switching to fragmented placement"
                        );
                        return self
                            .fragment(scenario, &ctx, auto_approve, &base_vars, &targets[index..], report)
                            .await;
                    }
                }
                AttemptOutcome::Cancelled => {
                    report.advance(Phase::Failed);
                    return Err(DeployError::Cancelled { report: Box::new(report) });
                }
                AttemptOutcome::Failed { .. } | AttemptOutcome::Placed => {
                    report.advance(Phase::Failed);
                    return Err(DeployError::Engine {
                        report: Box::new(report),
                        source: error,
                    });
                }
            }
        }

        report.advance(Phase::Failed);
        Err(DeployError::QuotaExhausted { report: Box::new(report) })
    }

    async fn fragment(
        &self,
        scenario: &mut Scenario,
        ctx: &EngineContext,
        auto_approve: bool,
        base_vars: &EngineVars,
        targets: &[Target],
        mut report: DeployReport,
    ) -> Result<DeployReport> {
        report.fragmented = true;
        let scenario_dir = scenario.working_dir.clone();
        let parallelism = self.options.fragment_parallelism.max(1);
        let mut remaining = report.requested;
        let mut queue = targets.iter().filter(|t| t.region.is_some());
        let mut regions_left = targets.iter().filter(|t| t.region.is_some()).count();

        while remaining > 0 {
            let mut batch: Vec<(&Target, u32)> = Vec::new();
            let mut budget = remaining;
            while batch.len() < parallelism && budget > 0 {
                let Some(target) = queue.next() else {
                    break;
                };
                let chunk = next_chunk(self.fragments.as_ref(), budget, regions_left);
                regions_left = regions_left.saturating_sub(1);
                budget -= chunk;
                batch.push((target, chunk));
            }
            if batch.is_empty() {
                break;
            }
            if ctx.cancel.is_cancelled() {
                report.advance(Phase::Failed);
                return Err(DeployError::Cancelled { report: Box::new(report) });
            }

            let results = join_all(batch.iter().map(|(target, chunk)| {
                self.place_fragment(&scenario_dir, ctx, auto_approve, base_vars, target, *chunk)
            }))
            .await;

            let mut abort = None;
            for ((target, chunk), result) in batch.into_iter().zip(results) {
                match result {
                    Ok(placement) => {
                        tracing::info!(
                            scenario = %scenario.id,
                            region = %placement.region,
                            nodes = placement.nodes,
                            "fragment placed"
                        );
                        remaining -= chunk;
                        report.record(target.region.as_deref(), chunk, true, AttemptOutcome::Placed);
                        report.placements.push(placement.clone());
                        scenario.fragments.push(placement);
                    }
                    Err((error, attempted)) => {
                        if let Some(leftover) = attempted {
                            self.keep_failed_fragment(scenario, ctx, leftover).await;
                        }
                        let outcome = AttemptOutcome::from_error(&error);
                        report.record(target.region.as_deref(), chunk, true, outcome.clone());
                        match outcome {
                            AttemptOutcome::QuotaExceeded(_) => tracing::warn!(
                                scenario = %scenario.id,
                                region = %target.label(),
                                "quota exceeded for fragment, trying next region"
                            ),
                            AttemptOutcome::Cancelled => {
                                abort.get_or_insert(Abort::Cancelled);
                            }
                            AttemptOutcome::Failed { .. } | AttemptOutcome::Placed => {
                                abort.get_or_insert(Abort::Engine(error));
                            }
                        }
                    }
                }
            }

            // Persist after every batch so cleanup can reach placed fragments
            self.store.update(scenario).await?;

            if let Some(abort) = abort {
                report.advance(Phase::Failed);
                let report = Box::new(report);
                return Err(match abort {
                    Abort::Cancelled => DeployError::Cancelled { report },
                    Abort::Engine(source) => DeployError::Engine { report, source },
                });
            }
        }

        if remaining == 0 {
            return self.finish_deploy(scenario, report, ctx).await;
        }

        report.advance(Phase::Failed);
        tracing::warn!(
            scenario = %scenario.id,
            placed = report.placed(),
            requested = report.requested,
            "fragmented placement incomplete"
        );
        let report = Box::new(report);
        if report.placed() > 0 {
            Err(DeployError::Partial { report })
        } else {
            Err(DeployError::QuotaExhausted { report })
        }
    }

    /// Provision one fragment. A failed apply also returns the attempted
    /// placement so its directory can be checked for leftovers.
    async fn place_fragment(
        &self,
        scenario_dir: &Path,
        ctx: &EngineContext,
        auto_approve: bool,
        base_vars: &EngineVars,
        target: &Target,
        nodes: u32,
    ) -> std::result::Result<Placement, (EngineError, Option<Placement>)> {
        let region = target.label().to_string();
        let dir = self
            .workspace
            .prepare_fragment(scenario_dir, &region)
            .await
            .map_err(|e| (EngineError::from(e), None))?;

        let mut vars = target.vars(base_vars);
        vars.insert("node_count".to_string(), nodes.to_string());
        let placement = Placement {
            region,
            nodes,
            working_dir: dir,
            vars,
        };
        match self
            .provision(&ctx.in_dir(&placement.working_dir), auto_approve, &placement.vars)
            .await
        {
            Ok(()) => Ok(placement),
            Err(error) => Err((error, Some(placement))),
        }
    }

    /// Record a failed fragment with zero nodes when its apply left state behind
    async fn keep_failed_fragment(&self, scenario: &mut Scenario, ctx: &EngineContext, mut attempted: Placement) {
        match self.engine.has_state(&ctx.in_dir(&attempted.working_dir)).await {
            Ok(true) => {
                tracing::warn!(
                    scenario = %scenario.id,
                    region = %attempted.region,
                    "failed fragment left resources behind, keeping it for teardown"
                );
                attempted.nodes = 0;
                scenario.fragments.push(attempted);
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(
                scenario = %scenario.id,
                region = %attempted.region,
                error = %e,
                "could not inspect failed fragment"
            ),
        }
    }

    async fn provision(
        &self,
        ctx: &EngineContext,
        auto_approve: bool,
        vars: &EngineVars,
    ) -> std::result::Result<(), EngineError> {
        self.engine.init(ctx).await?;
        self.engine.validate(ctx).await?;
        self.engine.plan(ctx, vars).await?;
        self.engine.apply(ctx, auto_approve, vars).await
    }

    async fn finish_deploy(
        &self,
        scenario: &mut Scenario,
        mut report: DeployReport,
        ctx: &EngineContext,
    ) -> Result<DeployReport> {
        scenario.transition(ScenarioStatus::Deployed)?;
        self.store.update(scenario).await?;
        report.advance(Phase::Deployed);

        for dir in self.state_dirs(scenario, ctx).await {
            match self.engine.state_list(&ctx.in_dir(&dir)).await {
                Ok(resources) if resources.is_empty() => tracing::warn!(
                    scenario = %scenario.id,
                    dir = %dir.display(),
                    "deployed but engine state lists no resources"
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(scenario = %scenario.id, error = %e, "could not verify state"),
            }
        }

        tracing::info!(scenario = %scenario.id, nodes = report.placed(), "scenario deployed");
        Ok(report)
    }

    async fn destroy_locked(
        &self,
        scenario: &mut Scenario,
        auto_approve: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Placement>> {
        if !scenario.status.can_transition_to(ScenarioStatus::Destroyed) {
            return Err(DeployError::InvalidTransition {
                scenario: scenario.id.clone(),
                from: scenario.status,
                to: ScenarioStatus::Destroyed,
            });
        }

        let env = self.resolver.resolve(scenario.kind.as_ref())?;
        let ctx = EngineContext::new(&scenario.working_dir, env, cancel.clone());
        let auto_approve = auto_approve.unwrap_or(self.options.auto_approve);
        tracing::info!(scenario = %scenario.id, "destroying");

        let mut destroyed = self.destroy_fragments(scenario, &ctx, auto_approve).await?;
        match scenario.placement.clone() {
            Some(placement) => {
                self.engine
                    .destroy(&ctx.in_dir(&placement.working_dir), auto_approve, &placement.vars)
                    .await?;
                destroyed.push(placement);
            }
            None if destroyed.is_empty() => {
                self.engine.destroy(&ctx, auto_approve, &scenario.attempt_vars).await?;
            }
            None => {
                if self.leftover_state(scenario, &ctx).await? {
                    self.destroy_leftovers(scenario, &ctx, auto_approve).await?;
                }
            }
        }

        scenario.transition(ScenarioStatus::Destroyed)?;
        self.store.update(scenario).await?;
        Ok(destroyed)
    }

    async fn cleanup_locked(
        &self,
        scenario: &mut Scenario,
        auto_approve: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Placement>> {
        if scenario.status != ScenarioStatus::Pending {
            return Err(DeployError::Unsupported(format!(
                "cleanup only applies to pending scenarios; {} is {}, use destroy",
                scenario.id, scenario.status
            )));
        }
        let lookup = EngineContext::new(
            &scenario.working_dir,
            self.resolver.resolve_available(scenario.kind.as_ref()),
            cancel.clone(),
        );
        let leftovers = self.leftover_state(scenario, &lookup).await?;
        if scenario.fragments.is_empty() && !leftovers {
            tracing::info!(scenario = %scenario.id, "nothing to clean up");
            return Ok(Vec::new());
        }

        let env = self.resolver.resolve(scenario.kind.as_ref())?;
        let ctx = EngineContext::new(&scenario.working_dir, env, cancel.clone());
        let auto_approve = auto_approve.unwrap_or(self.options.auto_approve);
        let destroyed = self.destroy_fragments(scenario, &ctx, auto_approve).await?;
        if leftovers {
            self.destroy_leftovers(scenario, &ctx, auto_approve).await?;
        }
        Ok(destroyed)
    }

    /// Whether the scenario directory holds state that no placement accounts for.
    ///
    /// Fragmentation only starts after a full-size apply failed there, and a
    /// failed apply keeps whatever it managed to create.
    async fn leftover_state(
        &self,
        scenario: &Scenario,
        ctx: &EngineContext,
    ) -> std::result::Result<bool, EngineError> {
        if scenario.placement.is_some() || !scenario.working_dir.exists() {
            return Ok(false);
        }
        self.engine.has_state(&ctx.in_dir(&scenario.working_dir)).await
    }

    async fn destroy_leftovers(
        &self,
        scenario: &Scenario,
        ctx: &EngineContext,
        auto_approve: bool,
    ) -> Result<()> {
        tracing::info!(
            scenario = %scenario.id,
            dir = %scenario.working_dir.display(),
            "destroying resources left by a failed apply"
        );
        self.engine
            .destroy(&ctx.in_dir(&scenario.working_dir), auto_approve, &scenario.attempt_vars)
            .await?;
        Ok(())
    }

    /// Directories holding engine state for a scenario
    async fn state_dirs(&self, scenario: &Scenario, ctx: &EngineContext) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = scenario
            .fragments
            .iter()
            .map(|f| f.working_dir.clone())
            .collect();
        if let Some(placement) = &scenario.placement {
            dirs.push(placement.working_dir.clone());
            return dirs;
        }
        match self.leftover_state(scenario, ctx).await {
            Ok(true) => dirs.push(scenario.working_dir.clone()),
            Ok(false) => {}
            Err(e) => tracing::warn!(scenario = %scenario.id, error = %e, "could not inspect scenario state"),
        }
        dirs
    }

    /// Destroy fragments in order, dropping each from the record once gone
    async fn destroy_fragments(
        &self,
        scenario: &mut Scenario,
        ctx: &EngineContext,
        auto_approve: bool,
    ) -> Result<Vec<Placement>> {
        let mut destroyed = Vec::new();
        while let Some(fragment) = scenario.fragments.first().cloned() {
            self.engine
                .destroy(&ctx.in_dir(&fragment.working_dir), auto_approve, &fragment.vars)
                .await?;
            tracing::info!(scenario = %scenario.id, region = %fragment.region, "fragment destroyed");
            scenario.fragments.remove(0);
            self.store.update(scenario).await?;
            destroyed.push(fragment);
        }
        Ok(destroyed)
    }

    fn node_count(&self, kind: Option<&TemplateKind>, request: &DeployRequest) -> u32 {
        let accepts = kind.is_some_and(TemplateKind::accepts_node_count);
        if !accepts {
            if request.node_count.is_some_and(|n| n > 1) {
                tracing::warn!("template does not take a node count, deploying a single unit");
            }
            return 1;
        }
        request
            .node_count
            .unwrap_or(self.options.default_node_count)
            .max(1)
    }

    /// Ordered regions to attempt
    async fn plan_targets(
        &self,
        scenario: &Scenario,
        kind: Option<&TemplateKind>,
        request: &DeployRequest,
        cancel: &CancellationToken,
    ) -> Vec<Target> {
        let requested = request.region.as_deref().filter(|r| !r.is_empty());
        let single = |region: &str| {
            vec![Target {
                region: Some(region.to_string()),
                instance_type: request.instance_type.clone(),
            }]
        };

        if let Some(fixed) = kind.and_then(TemplateKind::fixed_region) {
            if let Some(requested) = requested.filter(|r| *r != fixed) {
                tracing::warn!(
                    template = %scenario.template,
                    template_region = %fixed,
                    requested = %requested,
                    "region conflicts with region-scoped template; using the template's region"
                );
            }
            return single(fixed);
        }

        if let Some(fixed) = scenario.region.as_deref() {
            if let Some(requested) = requested.filter(|r| *r != fixed) {
                tracing::warn!(
                    scenario = %scenario.id,
                    scenario_region = %fixed,
                    requested = %requested,
                    "region conflicts with the scenario's region; using the scenario's region"
                );
            }
            return single(fixed);
        }

        let Some(provider) = kind.map(TemplateKind::provider) else {
            return match requested {
                Some(region) => single(region),
                None => vec![Target {
                    region: None,
                    instance_type: request.instance_type.clone(),
                }],
            };
        };

        let mut regions: Vec<String> = Vec::new();
        let configured = self.resolver.default_region(provider);
        for region in requested
            .map(str::to_string)
            .into_iter()
            .chain(configured)
            .chain(provider.default_regions().iter().map(|r| r.to_string()))
        {
            if !regions.contains(&region) {
                regions.push(region);
            }
        }

        let mut instance_types: HashMap<String, String> = HashMap::new();
        if let (true, Some(optimizer)) = (request.optimize, &self.optimizer) {
            let types: Vec<String> = request.instance_type.iter().cloned().collect();
            match optimizer.rank(provider, &types, &regions, cancel).await {
                Ok(ranked) => {
                    let mut ordered: Vec<String> = requested.map(str::to_string).into_iter().collect();
                    for config in &ranked {
                        instance_types
                            .entry(config.region().to_string())
                            .or_insert_with(|| config.instance_type().to_string());
                        if !ordered.iter().any(|r| r == config.region()) {
                            ordered.push(config.region().to_string());
                        }
                    }
                    for region in regions {
                        if !ordered.contains(&region) {
                            ordered.push(region);
                        }
                    }
                    regions = ordered;
                }
                Err(e) => tracing::warn!(provider = %provider, error = %e, "price lookup failed, keeping default order"),
            }
        }

        if let Some(probe) = self.probe.as_ref().filter(|p| p.supports(provider)) {
            let found = probe
                .find_available_regions(provider, provider.default_instance_family(), &regions, cancel)
                .await;
            let pruned = prune(&regions, &found);
            if pruned.len() < regions.len() {
                tracing::info!(provider = %provider, kept = pruned.len(), of = regions.len(), "pruned regions without spot capacity");
            }
            regions = pruned;
        }

        regions
            .into_iter()
            .map(|region| Target {
                instance_type: instance_types
                    .get(&region)
                    .cloned()
                    .or_else(|| request.instance_type.clone()),
                region: Some(region),
            })
            .collect()
    }
}

async fn release(lock: ScenarioLock) {
    if let Err(e) = lock.release().await {
        tracing::warn!(error = %e, "failed to release scenario lock");
    }
}
