use async_trait::async_trait;
use pmon_shared::{BasicInfo, StatusResponse};

use crate::prelude::*;

/// Read side of a process monitor
#[async_trait(?Send)]
pub trait SnapshotSource {
    /// Identity of the process `pid`, or of the master process when `pid` is `None`
    async fn get_basic(&self, pid: Option<u32>) -> Result<BasicInfo>;

    /// Current state of every monitored process
    async fn get_status(&self) -> Result<StatusResponse>;
}
