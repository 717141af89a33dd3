//! Time-bounded cache of optimal configurations

use skyfleet_cloud::{OptimalConfig, Provider, TemplateRef};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(60 * 60);

/// `(provider, template)` → last optimal config, valid for `ttl`
#[derive(Debug)]
pub struct QuoteCache {
    ttl: Duration,
    entries: RwLock<HashMap<(Provider, TemplateRef), (Instant, OptimalConfig)>>,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_TTL)
    }
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry, or `None` when missing or stale
    pub fn get(&self, provider: Provider, template: &TemplateRef) -> Option<OptimalConfig> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, config) = entries.get(&(provider, template.clone()))?;
        if stored_at.elapsed() < self.ttl {
            Some(config.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, provider: Provider, template: TemplateRef, config: OptimalConfig) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert((provider, template), (Instant::now(), config));
    }

    pub fn invalidate(&self, provider: Provider, template: &TemplateRef) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&(provider, template.clone()));
    }

    /// Drop stale entries
    pub fn purge(&self) {
        let ttl = self.ttl;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
