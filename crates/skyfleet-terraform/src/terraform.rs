//! terraform CLI wrapper

use crate::classify;
use crate::engine::{EngineContext, EngineVars, ProvisioningEngine};
use crate::error::{EngineError, Operation, Result};
use crate::show::{self, ResourceDetail};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Saved plan consumed by a non-auto-approved apply
pub const PLAN_FILE: &str = "skyfleet.tfplan";

/// Saved destroy plan consumed by a non-auto-approved destroy
pub const DESTROY_PLAN_FILE: &str = "skyfleet-destroy.tfplan";

/// Local backend state file
pub const STATE_FILE: &str = "terraform.tfstate";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// terraform CLI wrapper
#[derive(Debug, Clone)]
pub struct Terraform {
    exec_path: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct VersionOutput {
    terraform_version: String,
}

impl Default for Terraform {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl Terraform {
    pub fn new(exec_path: impl AsRef<Path>) -> Self {
        Self {
            exec_path: exec_path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for a single command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    /// Installed terraform version
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.exec_path)
            .args(["version", "-json"])
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(EngineError::NotInstalled(self.exec_path.display().to_string()));
        }
        let version: VersionOutput = serde_json::from_slice(&output.stdout)?;
        Ok(version.terraform_version)
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotInstalled(self.exec_path.display().to_string())
        } else {
            EngineError::Io(e)
        }
    }

    fn var_args(vars: &EngineVars) -> Vec<String> {
        vars.iter()
            .flat_map(|(k, v)| ["-var".to_string(), format!("{}={}", k, v)])
            .collect()
    }

    /// Run a terraform command in the context's working directory and return stdout
    async fn run(&self, ctx: &EngineContext, operation: Operation, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.exec_path);
        cmd.args(args)
            .current_dir(&ctx.working_dir)
            .envs(ctx.env.iter())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            dir = %ctx.working_dir.display(),
            env = ?ctx.env,
            "Running: {} {}",
            self.exec_path.display(),
            args.join(" ")
        );

        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        // Dropping the wait future drops the child, and kill_on_drop terminates it.
        let output = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                tracing::warn!(%operation, "terraform cancelled, terminating subprocess");
                return Err(EngineError::Cancelled(operation));
            }
            waited = tokio::time::timeout(self.timeout, child.wait_with_output()) => match waited {
                Ok(output) => output?,
                Err(_) => return Err(EngineError::Timeout(operation, self.timeout)),
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostics = classify::parse_diagnostics(&stdout);
            let kind = classify::classify(&diagnostics, &stderr);
            let message = classify::summarize(&diagnostics, &stderr, &stdout);
            tracing::debug!(%operation, %kind, "terraform failed: {}", message);
            return Err(EngineError::Failed {
                operation,
                kind,
                message,
            });
        }

        Ok(stdout)
    }
}

fn args<const N: usize>(fixed: [&str; N]) -> Vec<String> {
    fixed.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl ProvisioningEngine for Terraform {
    async fn init(&self, ctx: &EngineContext) -> Result<()> {
        self.run(ctx, Operation::Init, &args(["init", "-input=false", "-no-color"]))
            .await?;
        Ok(())
    }

    async fn validate(&self, ctx: &EngineContext) -> Result<()> {
        self.run(ctx, Operation::Validate, &args(["validate", "-json", "-no-color"]))
            .await?;
        Ok(())
    }

    async fn plan(&self, ctx: &EngineContext, vars: &EngineVars) -> Result<()> {
        let mut argv = args(["plan", "-input=false", "-json"]);
        argv.push(format!("-out={}", PLAN_FILE));
        argv.extend(Self::var_args(vars));
        self.run(ctx, Operation::Plan, &argv).await?;
        Ok(())
    }

    async fn apply(&self, ctx: &EngineContext, auto_approve: bool, vars: &EngineVars) -> Result<()> {
        let mut argv = args(["apply", "-input=false", "-json"]);
        if auto_approve {
            argv.push("-auto-approve".to_string());
            argv.extend(Self::var_args(vars));
        } else {
            // A saved plan already carries its variables and needs no approval prompt.
            argv.push(PLAN_FILE.to_string());
        }
        self.run(ctx, Operation::Apply, &argv).await?;
        Ok(())
    }

    async fn destroy(&self, ctx: &EngineContext, auto_approve: bool, vars: &EngineVars) -> Result<()> {
        if auto_approve {
            let mut argv = args(["destroy", "-input=false", "-json", "-auto-approve"]);
            argv.extend(Self::var_args(vars));
            self.run(ctx, Operation::Destroy, &argv).await?;
            return Ok(());
        }

        // With input disabled terraform cannot prompt, so go through a saved destroy plan.
        let mut argv = args(["plan", "-destroy", "-input=false", "-json"]);
        argv.push(format!("-out={}", DESTROY_PLAN_FILE));
        argv.extend(Self::var_args(vars));
        self.run(ctx, Operation::Destroy, &argv).await?;

        let argv = args(["apply", "-input=false", "-json", DESTROY_PLAN_FILE]);
        self.run(ctx, Operation::Destroy, &argv).await?;
        Ok(())
    }

    async fn state_list(&self, ctx: &EngineContext) -> Result<Vec<String>> {
        let stdout = self
            .run(ctx, Operation::StateList, &args(["state", "list"]))
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn show_resources(&self, ctx: &EngineContext) -> Result<Vec<ResourceDetail>> {
        let stdout = self
            .run(ctx, Operation::Show, &args(["show", "-json", "-no-color"]))
            .await?;
        show::parse_resources(&stdout)
    }

    async fn has_state(&self, ctx: &EngineContext) -> Result<bool> {
        // Never initialized and no local state: nothing to ask terraform about
        if !ctx.working_dir.join(".terraform").exists() && !ctx.working_dir.join(STATE_FILE).exists() {
            return Ok(false);
        }
        Ok(!self.state_list(ctx).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_args_are_sorted_pairs() {
        let vars = EngineVars::from([
            ("region".to_string(), "cn-shanghai".to_string()),
            ("node_count".to_string(), "2".to_string()),
        ]);
        assert_eq!(
            Terraform::var_args(&vars),
            vec!["-var", "node_count=2", "-var", "region=cn-shanghai"]
        );
    }
}
