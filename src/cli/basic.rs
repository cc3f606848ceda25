use clap::Args;

use crate::monitor::SnapshotSource;
use crate::monitor_client::MonitorClient;
use crate::prelude::*;

#[derive(Args, Debug)]
pub struct BasicArgs {
    /// Pid of the process, the master process when omitted
    pub pid: Option<u32>,
}

pub async fn run(args: BasicArgs, client: &MonitorClient) -> Result<()> {
    let info = client.get_basic(args.pid).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
