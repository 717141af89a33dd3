//! tccli CLI wrapper
//!
//! Wraps the Tencent Cloud CLI. Credentials are handed to the child process
//! through `TENCENTCLOUD_SECRET_ID` / `TENCENTCLOUD_SECRET_KEY` so they never
//! show up in the process list.

use crate::error::{Result, TencentError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skyfleet_cloud::{CredentialSet, Provider};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// tccli CLI wrapper
#[derive(Debug, Clone)]
pub struct Tccli {
    exec_path: PathBuf,
}

impl Default for Tccli {
    fn default() -> Self {
        Self::new("tccli")
    }
}

impl Tccli {
    pub fn new(exec_path: impl Into<PathBuf>) -> Self {
        Self {
            exec_path: exec_path.into(),
        }
    }

    /// Run a tccli command in `region` and return stdout
    async fn run_command(
        &self,
        credentials: &CredentialSet,
        region: &str,
        args: &[&str],
    ) -> Result<String> {
        let env = Provider::Tencent.credential_env();
        let mut cmd = Command::new(&self.exec_path);
        cmd.args(args);
        cmd.arg("--region").arg(region);
        cmd.env(env.access_key, &credentials.access_key);
        cmd.env(env.secret_key, &credentials.secret_key);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running: tccli {} --region {}", args.join(" "), region);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TencentError::TccliNotFound
            } else {
                TencentError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TencentError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Sellable instance configurations of `instance_family` in `region`
    pub async fn describe_zone_instance_configs(
        &self,
        credentials: &CredentialSet,
        region: &str,
        instance_family: &str,
        charge_type: &str,
    ) -> Result<Vec<InstanceTypeQuota>> {
        let filters = serde_json::to_string(&[
            Filter::new("instance-family", instance_family),
            Filter::new("instance-charge-type", charge_type),
        ])?;
        let output = self
            .run_command(
                credentials,
                region,
                &["cvm", "DescribeZoneInstanceConfigInfos", "--Filters", &filters],
            )
            .await?;

        let response: ZoneInstanceConfigInfos = parse_response(&output)?;
        Ok(response.instance_type_quota_set)
    }
}

/// tccli prints either the bare response or one wrapped in `Response`
fn parse_response<T: DeserializeOwned>(output: &str) -> Result<T> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope<T> {
        Wrapped {
            #[serde(rename = "Response")]
            response: T,
        },
        Bare(T),
    }

    match serde_json::from_str::<Envelope<T>>(output.trim())? {
        Envelope::Wrapped { response } | Envelope::Bare(response) => Ok(response),
    }
}

#[derive(Debug, Serialize)]
struct Filter<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Values")]
    values: [&'a str; 1],
}

impl<'a> Filter<'a> {
    fn new(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            values: [value],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ZoneInstanceConfigInfos {
    #[serde(rename = "InstanceTypeQuotaSet", default)]
    instance_type_quota_set: Vec<InstanceTypeQuota>,
}

/// One zone/instance-type entry from DescribeZoneInstanceConfigInfos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceTypeQuota {
    #[serde(rename = "Zone")]
    pub zone: String,

    #[serde(rename = "InstanceType")]
    pub instance_type: String,

    #[serde(rename = "InstanceFamily", default)]
    pub instance_family: String,

    #[serde(rename = "InstanceChargeType", default)]
    pub instance_charge_type: String,

    /// `SELL` or `SOLD_OUT`
    #[serde(rename = "Status")]
    pub status: String,
}

impl InstanceTypeQuota {
    pub fn is_selling(&self) -> bool {
        self.status == "SELL"
    }
}
