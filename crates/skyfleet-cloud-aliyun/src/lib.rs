//! Alibaba Cloud provider for skyfleet
//!
//! Talks to the ECS RPC API directly (signed GET requests) for:
//!
//! - **DescribePrice**: hourly pay-as-you-go quotes ([`AliyunPriceClient`])
//! - **DescribeAvailableResource**: spot stock per region ([`AliyunCapacitySignal`])
//! - **DescribeRegions**: regions visible to the account

pub mod capacity;
pub mod error;
pub mod price;
pub mod rpc;

pub use capacity::AliyunCapacitySignal;
pub use error::{AliyunError, Result};
pub use price::AliyunPriceClient;
pub use rpc::{ECS_ENDPOINT, EcsClient, sign_query};
