//! Provisioning engine boundary

use crate::error::Result;
use crate::show::ResourceDetail;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Non-secret `-var` arguments
pub type EngineVars = BTreeMap<String, String>;

/// Environment variables injected into the engine process.
///
/// Credentials only ever travel this way, never as command-line arguments.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretEnv {
    vars: BTreeMap<String, String>,
}

impl SecretEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for SecretEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.vars.keys()).finish()
    }
}

/// Where and how one engine call runs
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub working_dir: PathBuf,
    pub env: SecretEnv,
    pub cancel: CancellationToken,
}

impl EngineContext {
    pub fn new(working_dir: impl AsRef<Path>, env: SecretEnv, cancel: CancellationToken) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            env,
            cancel,
        }
    }

    /// Same environment and cancellation, different directory
    pub fn in_dir(&self, working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            env: self.env.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Infrastructure-as-code engine driven per working directory.
///
/// Failures come back as [`crate::EngineError`] with a classified kind so
/// callers never inspect message text.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    async fn init(&self, ctx: &EngineContext) -> Result<()>;

    async fn validate(&self, ctx: &EngineContext) -> Result<()>;

    async fn plan(&self, ctx: &EngineContext, vars: &EngineVars) -> Result<()>;

    async fn apply(&self, ctx: &EngineContext, auto_approve: bool, vars: &EngineVars) -> Result<()>;

    async fn destroy(&self, ctx: &EngineContext, auto_approve: bool, vars: &EngineVars)
    -> Result<()>;

    /// Resource addresses tracked in state
    async fn state_list(&self, ctx: &EngineContext) -> Result<Vec<String>>;

    /// Compute instances found in state
    async fn show_resources(&self, ctx: &EngineContext) -> Result<Vec<ResourceDetail>>;

    /// Whether the working directory tracks any resources
    async fn has_state(&self, ctx: &EngineContext) -> Result<bool> {
        Ok(!self.state_list(ctx).await?.is_empty())
    }
}
