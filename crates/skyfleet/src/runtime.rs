//! Wiring from settings to the library components

use anyhow::Context;
use skyfleet_cloud::{CredentialStore, Currency, FanOut, FileScenarioStore};
use skyfleet_cloud_aliyun::{AliyunCapacitySignal, AliyunPriceClient, EcsClient};
use skyfleet_cloud_tencent::{Tccli, TencentCapacitySignal};
use skyfleet_config::{FileCredentialStore, Settings};
use skyfleet_deploy::{DeployOptions, DeploymentOrchestrator};
use skyfleet_pricing::{
    CapacityProbe, CatalogPriceClient, ConversionTable, PriceOptimizer, QuoteCache, QuoteRouter,
};
use skyfleet_terraform::Terraform;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Runtime {
    pub settings: Settings,
    pub project_root: PathBuf,
    pub store: Arc<FileScenarioStore>,
    pub credentials: Arc<FileCredentialStore>,
}

impl Runtime {
    pub fn load() -> anyhow::Result<Self> {
        let settings = skyfleet_config::load_settings()?;
        let project_root = std::env::current_dir()?;
        let store = Arc::new(FileScenarioStore::in_dir(
            project_root.join(&settings.state_dir),
        ));
        let credentials_path = settings.credentials_path();
        let credentials = Arc::new(FileCredentialStore::load(credentials_path.as_deref())?);
        tracing::debug!(
            providers = ?credentials.providers(),
            source = ?credentials.source(),
            "credentials loaded"
        );

        Ok(Self {
            settings,
            project_root,
            store,
            credentials,
        })
    }

    fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.credentials.clone()
    }

    pub fn conversion(&self) -> anyhow::Result<ConversionTable> {
        let pricing = &self.settings.pricing;
        let reference: Currency = pricing
            .reference_currency
            .parse()
            .context("pricing.reference_currency")?;
        let mut table = ConversionTable::new(reference);
        for (code, rate) in &pricing.rates {
            let currency: Currency = code.parse().context("pricing.rates")?;
            table = table.with_rate(currency, *rate);
        }
        Ok(table)
    }

    /// Live Aliyun quotes first, the static catalog for everything else
    pub fn optimizer(&self) -> anyhow::Result<PriceOptimizer> {
        let pricing = &self.settings.pricing;
        let router = QuoteRouter::new()
            .with(Arc::new(AliyunPriceClient::new(
                EcsClient::new()?,
                self.credential_store(),
            )))
            .with(Arc::new(CatalogPriceClient::default()));

        Ok(PriceOptimizer::new(Arc::new(router))
            .with_fan_out(FanOut::new(pricing.max_in_flight, pricing.quote_timeout()))
            .with_conversion(self.conversion()?)
            .with_cache(QuoteCache::new(pricing.cache_ttl())))
    }

    pub fn probe(&self) -> anyhow::Result<CapacityProbe> {
        let capacity = &self.settings.capacity;
        Ok(
            CapacityProbe::new(FanOut::new(capacity.max_in_flight, capacity.probe_timeout()))
                .with(Arc::new(AliyunCapacitySignal::new(
                    EcsClient::new()?,
                    self.credential_store(),
                )))
                .with(Arc::new(TencentCapacitySignal::new(
                    Tccli::default(),
                    self.credential_store(),
                ))),
        )
    }

    pub fn orchestrator(&self, with_probe: bool) -> anyhow::Result<DeploymentOrchestrator> {
        let terraform = &self.settings.terraform;
        let deploy = &self.settings.deploy;
        let engine = Terraform::new(&terraform.exec_path).with_timeout(terraform.timeout());

        let mut orchestrator =
            DeploymentOrchestrator::new(Arc::new(engine), self.store.clone(), self.credential_store())
                .with_optimizer(Arc::new(self.optimizer()?))
                .with_options(DeployOptions {
                    auto_approve: deploy.auto_approve,
                    fragment_parallelism: deploy.fragment_parallelism,
                    default_node_count: deploy.default_node_count,
                });
        if with_probe {
            orchestrator = orchestrator.with_probe(Arc::new(self.probe()?));
        }
        Ok(orchestrator)
    }
}
