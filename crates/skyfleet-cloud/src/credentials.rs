//! Read-only credential lookup

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Access key pair for one provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub default_region: Option<String>,
}

impl CredentialSet {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            default_region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = Some(region.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("default_region", &self.default_region)
            .finish()
    }
}

/// Source of provider credentials. Callers only ever read from it.
pub trait CredentialStore: Send + Sync {
    fn credentials(&self, provider: Provider) -> Option<CredentialSet>;
}

/// In-memory store, filled once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    entries: HashMap<Provider, CredentialSet>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Provider, credentials: CredentialSet) -> Self {
        self.insert(provider, credentials);
        self
    }

    pub fn insert(&mut self, provider: Provider, credentials: CredentialSet) {
        self.entries.insert(provider, credentials);
    }

    /// Stored entry, complete or not
    pub fn raw(&self, provider: Provider) -> Option<&CredentialSet> {
        self.entries.get(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.entries.keys().copied()
    }
}

impl CredentialStore for StaticCredentialStore {
    fn credentials(&self, provider: Provider) -> Option<CredentialSet> {
        self.entries
            .get(&provider)
            .filter(|c| c.is_complete())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = CredentialSet::new("AKID", "very-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_incomplete_entries_are_hidden() {
        let store = StaticCredentialStore::new()
            .with(Provider::Aliyun, CredentialSet::new("AKID", ""))
            .with(Provider::Tencent, CredentialSet::new("id", "key"));
        assert!(store.credentials(Provider::Aliyun).is_none());
        assert!(store.credentials(Provider::Tencent).is_some());
        assert!(store.credentials(Provider::Aws).is_none());
    }
}
