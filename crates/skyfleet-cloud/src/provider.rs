//! Provider identity and per-provider catalogue data

use crate::error::CloudError;
use crate::quote::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aliyun,
    Tencent,
    Huaweicloud,
    Aws,
    Vultr,
}

/// Environment variable names the provisioning engine's provider plugins read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialEnv {
    pub access_key: &'static str,
    pub secret_key: &'static str,
    pub region: &'static str,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Aliyun,
        Provider::Tencent,
        Provider::Huaweicloud,
        Provider::Aws,
        Provider::Vultr,
    ];

    /// Returns the identifier used in template refs (e.g., "aliyun")
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Aliyun => "aliyun",
            Provider::Tencent => "tencent",
            Provider::Huaweicloud => "huaweicloud",
            Provider::Aws => "aws",
            Provider::Vultr => "vultr",
        }
    }

    /// Returns the provider display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aliyun => "Alibaba Cloud",
            Provider::Tencent => "Tencent Cloud",
            Provider::Huaweicloud => "Huawei Cloud",
            Provider::Aws => "AWS",
            Provider::Vultr => "Vultr",
        }
    }

    /// Currency the provider bills in
    pub fn native_currency(&self) -> Currency {
        match self {
            Provider::Aliyun | Provider::Tencent | Provider::Huaweicloud => Currency::Cny,
            Provider::Aws | Provider::Vultr => Currency::Usd,
        }
    }

    /// Commonly supported regions, in failover order
    pub fn default_regions(&self) -> &'static [&'static str] {
        match self {
            Provider::Aliyun => &[
                "cn-beijing",
                "cn-shanghai",
                "cn-hangzhou",
                "cn-shenzhen",
                "cn-hongkong",
                "ap-southeast-1",
            ],
            Provider::Tencent => &[
                "ap-shanghai",
                "ap-nanjing",
                "ap-guangzhou",
                "ap-beijing",
                "ap-chengdu",
                "ap-chongqing",
            ],
            Provider::Huaweicloud => &["cn-north-4", "cn-east-3", "cn-south-1", "ap-southeast-1"],
            Provider::Aws => &["us-east-1", "us-west-2", "ap-northeast-1", "ap-southeast-1"],
            Provider::Vultr => &["hkg", "nrt", "sgp", "lax"],
        }
    }

    /// Small burstable instance types used when the caller gives none
    pub fn default_instance_types(&self) -> &'static [&'static str] {
        match self {
            Provider::Aliyun => &[
                "ecs.t5-lc1m1.small",
                "ecs.t5-lc1m2.small",
                "ecs.t6-c1m1.large",
            ],
            Provider::Tencent => &["S5.SMALL1", "S5.SMALL2"],
            Provider::Huaweicloud => &["s6.small.1"],
            Provider::Aws => &["t3.micro", "t3.small"],
            Provider::Vultr => &["vc2-1c-1gb"],
        }
    }

    /// Instance family probed for spot capacity when none is given
    pub fn default_instance_family(&self) -> &'static str {
        match self {
            Provider::Aliyun => "ecs.t5",
            Provider::Tencent => "S5",
            Provider::Huaweicloud => "s6",
            Provider::Aws => "t3",
            Provider::Vultr => "vc2",
        }
    }

    pub fn credential_env(&self) -> CredentialEnv {
        match self {
            Provider::Aliyun => CredentialEnv {
                access_key: "ALICLOUD_ACCESS_KEY",
                secret_key: "ALICLOUD_SECRET_KEY",
                region: "ALICLOUD_REGION",
            },
            Provider::Tencent => CredentialEnv {
                access_key: "TENCENTCLOUD_SECRET_ID",
                secret_key: "TENCENTCLOUD_SECRET_KEY",
                region: "TENCENTCLOUD_REGION",
            },
            Provider::Huaweicloud => CredentialEnv {
                access_key: "HUAWEICLOUD_ACCESS_KEY",
                secret_key: "HUAWEICLOUD_SECRET_KEY",
                region: "HUAWEICLOUD_REGION",
            },
            Provider::Aws => CredentialEnv {
                access_key: "AWS_ACCESS_KEY_ID",
                secret_key: "AWS_SECRET_ACCESS_KEY",
                region: "AWS_REGION",
            },
            // Vultr authenticates with a single API key; the secret slot carries it.
            Provider::Vultr => CredentialEnv {
                access_key: "VULTR_API_KEY",
                secret_key: "VULTR_API_KEY",
                region: "VULTR_REGION",
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aliyun" | "alicloud" => Ok(Provider::Aliyun),
            "tencent" | "tencentcloud" => Ok(Provider::Tencent),
            "huaweicloud" | "huawei" => Ok(Provider::Huaweicloud),
            "aws" => Ok(Provider::Aws),
            "vultr" => Ok(Provider::Vultr),
            other => Err(CloudError::UnknownProvider(other.to_string())),
        }
    }
}
