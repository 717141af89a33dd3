//! Provider credentials from an INI file and the environment
//!
//! ```ini
//! [aliyun]
//! access_key = LTAI...
//! secret_key = ...
//! region = cn-hangzhou
//!
//! [tencent]
//! secret_id = AKID...
//! secret_key = ...
//! ```
//!
//! Provider environment variables (`ALICLOUD_ACCESS_KEY`,
//! `TENCENTCLOUD_SECRET_ID`, ...) override individual file values.

use crate::error::{ConfigError, Result};
use configparser::ini::Ini;
use skyfleet_cloud::{CredentialSet, CredentialStore, Provider, StaticCredentialStore};
use std::path::{Path, PathBuf};

/// Read-only store built once at startup
#[derive(Debug, Clone, Default)]
pub struct FileCredentialStore {
    inner: StaticCredentialStore,
    source: Option<PathBuf>,
}

impl FileCredentialStore {
    /// Load `path` (a missing file is an empty store), then overlay the
    /// process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut store = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                let mut store = Self::from_ini_str(&content).map_err(|message| {
                    ConfigError::Credentials {
                        path: path.to_path_buf(),
                        message,
                    }
                })?;
                store.source = Some(path.to_path_buf());
                store
            }
            Some(path) => {
                tracing::debug!(path = %path.display(), "no credentials file");
                Self::default()
            }
            None => Self::default(),
        };
        store.overlay(|name| std::env::var(name).ok());
        Ok(store)
    }

    pub fn from_ini_str(content: &str) -> std::result::Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(content.to_string())?;

        let mut store = Self::default();
        for section in ini.sections() {
            let provider = match section.parse::<Provider>() {
                Ok(provider) => provider,
                Err(_) => {
                    tracing::warn!(section = %section, "ignoring unknown provider section");
                    continue;
                }
            };
            let access_key = ini
                .get(&section, "access_key")
                .or_else(|| ini.get(&section, "secret_id"))
                .unwrap_or_default();
            let secret_key = ini.get(&section, "secret_key").unwrap_or_default();
            let mut credentials = CredentialSet::new(access_key, secret_key);
            credentials.default_region = ini.get(&section, "region").filter(|r| !r.is_empty());
            store.inner.insert(provider, credentials);
        }
        Ok(store)
    }

    /// Replace file values with non-empty variables from `lookup`
    pub fn overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());
        for provider in Provider::ALL {
            let env = provider.credential_env();
            let access_key = lookup(env.access_key);
            let secret_key = lookup(env.secret_key);
            let region = lookup(env.region);
            if access_key.is_none() && secret_key.is_none() && region.is_none() {
                continue;
            }

            let mut credentials = self
                .inner
                .raw(provider)
                .cloned()
                .unwrap_or_else(|| CredentialSet::new("", ""));
            if let Some(access_key) = access_key {
                credentials.access_key = access_key;
            }
            if let Some(secret_key) = secret_key {
                credentials.secret_key = secret_key;
            }
            if region.is_some() {
                credentials.default_region = region;
            }
            self.inner.insert(provider, credentials);
        }
    }

    /// Providers with a complete key pair
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self
            .inner
            .providers()
            .filter(|p| self.inner.credentials(*p).is_some())
            .collect();
        providers.sort();
        providers
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl CredentialStore for FileCredentialStore {
    fn credentials(&self, provider: Provider) -> Option<CredentialSet> {
        self.inner.credentials(provider)
    }
}
