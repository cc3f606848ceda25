use clap::Args;

use super::{MonitorArgs, OutputArgs};
use crate::config::MonitorSettings;
use crate::monitor::{CycleOutcome, Poller};
use crate::monitor_client::MonitorClient;
use crate::prelude::*;
use crate::render::render;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(args: StatusArgs, client: MonitorClient, settings: MonitorSettings) -> Result<()> {
    let mut poller = Poller::new(client, settings);

    match poller.run_cycle().await {
        CycleOutcome::Updated(report) => {
            println!("{}", render(&args.output, poller.state(), report.tree.as_ref())?);
            Ok(())
        }
        CycleOutcome::Failed(err) => Err(err.context("Could not retrieve process status")),
    }
}
