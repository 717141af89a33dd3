//! Tencent Cloud provider for skyfleet
//!
//! Spot capacity is read through the `tccli` CLI
//! (`cvm DescribeZoneInstanceConfigInfos`, spot charge type).

pub mod capacity;
pub mod error;
pub mod tccli;

pub use capacity::TencentCapacitySignal;
pub use error::{Result, TencentError};
pub use tccli::{InstanceTypeQuota, Tccli};
