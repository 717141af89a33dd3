//! Secret resolution for engine runs
//!
//! Every template under a provider needs that provider's key pair in the
//! provider plugin's environment variables. Some families also declare the
//! keys as template variables, which are passed as `TF_VAR_*` so they never
//! show up in argument lists. Task executors additionally stage their
//! program from Aliyun object storage.

use crate::error::{DeployError, Result};
use skyfleet_cloud::{CredentialSet, CredentialStore, NodeScaling, Provider, TemplateKind, TemplateRef};
use skyfleet_terraform::SecretEnv;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Half of a key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    AccessKey,
    SecretKey,
}

/// One secret value and the environment variable it is injected as
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretField {
    /// Whose stored credentials supply the value
    pub provider: Provider,
    pub part: KeyPart,
    pub env: String,
}

impl SecretField {
    fn new(provider: Provider, part: KeyPart, env: impl Into<String>) -> Self {
        Self {
            provider,
            part,
            env: env.into(),
        }
    }

    fn pair(provider: Provider, access_env: &str, secret_env: &str) -> [Self; 2] {
        [
            Self::new(provider, KeyPart::AccessKey, access_env),
            Self::new(provider, KeyPart::SecretKey, secret_env),
        ]
    }

    fn template_var(provider: Provider, access_var: &str, secret_var: &str) -> [Self; 2] {
        Self::pair(
            provider,
            &format!("TF_VAR_{}", access_var),
            &format!("TF_VAR_{}", secret_var),
        )
    }

    fn value<'a>(&self, credentials: &'a CredentialSet) -> &'a str {
        match self.part {
            KeyPart::AccessKey => &credentials.access_key,
            KeyPart::SecretKey => &credentials.secret_key,
        }
    }
}

/// Secrets a template needs. Unknown templates need none.
pub fn required_secrets(kind: Option<&TemplateKind>) -> BTreeSet<SecretField> {
    let Some(kind) = kind else {
        return BTreeSet::new();
    };
    let provider = kind.provider();
    let env = provider.credential_env();

    let mut fields = BTreeSet::new();
    fields.extend(SecretField::pair(provider, env.access_key, env.secret_key));

    match provider {
        Provider::Tencent => fields.extend(SecretField::template_var(
            provider,
            "tencentcloud_secret_id",
            "tencentcloud_secret_key",
        )),
        Provider::Huaweicloud => {
            fields.extend(SecretField::template_var(provider, "access_key", "secret_key"))
        }
        Provider::Aliyun if is_proxy(kind) => {
            fields.extend(SecretField::template_var(provider, "access_key", "secret_key"))
        }
        _ => {}
    }

    if let TemplateKind::TaskExecutor { .. } = kind {
        fields.extend(SecretField::template_var(
            Provider::Aliyun,
            "oss_access_key_id",
            "oss_access_key_secret",
        ));
    }
    fields
}

/// [`required_secrets`] straight from a template ref
pub fn required_secrets_for(template: &TemplateRef) -> BTreeSet<SecretField> {
    required_secrets(template.kind().as_ref())
}

fn is_proxy(kind: &TemplateKind) -> bool {
    match kind {
        TemplateKind::RegionScopedProxy { .. } => true,
        TemplateKind::StandardProvisioning { scaling, .. } => *scaling != NodeScaling::Fixed,
        TemplateKind::TaskExecutor { .. } => false,
    }
}

/// Reads credentials for a template from the injected store
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Engine environment carrying every required secret.
    ///
    /// Fails with `AuthMissing` naming the first provider whose
    /// credentials are absent or incomplete.
    pub fn resolve(&self, kind: Option<&TemplateKind>) -> Result<SecretEnv> {
        let mut env = SecretEnv::new();
        for field in required_secrets(kind) {
            let credentials = self
                .store
                .credentials(field.provider)
                .filter(CredentialSet::is_complete)
                .ok_or(DeployError::AuthMissing(field.provider))?;
            env.insert(field.env.clone(), field.value(&credentials));
        }
        if !env.is_empty() {
            tracing::debug!(vars = ?env, "resolved engine secrets");
        }
        Ok(env)
    }

    /// Like [`resolve`](Self::resolve) but skips missing providers
    pub fn resolve_available(&self, kind: Option<&TemplateKind>) -> SecretEnv {
        let mut env = SecretEnv::new();
        for field in required_secrets(kind) {
            if let Some(credentials) = self.store.credentials(field.provider) {
                env.insert(field.env.clone(), field.value(&credentials));
            }
        }
        env
    }

    /// Region configured alongside the provider's credentials
    pub fn default_region(&self, provider: Provider) -> Option<String> {
        self.store
            .credentials(provider)
            .and_then(|c| c.default_region)
            .filter(|r| !r.is_empty())
    }
}
