use clap::Args;
use console::style;

use super::{MonitorArgs, OutputArgs, OutputFormat, show_banner};
use crate::config::MonitorSettings;
use crate::monitor::{CycleOutcome, CycleReport, MonitorState, Poller};
use crate::monitor_client::MonitorClient;
use crate::prelude::*;
use crate::render::render;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Stop after this number of poll cycles instead of running until interrupted
    #[arg(long)]
    pub count: Option<u64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(args: WatchArgs, client: MonitorClient, settings: MonitorSettings) -> Result<()> {
    show_banner(client.base_url().as_str());
    let output = args.output;
    let mut poller = Poller::new(client, settings);

    let watch = poller.run(args.count, |state, outcome| {
        if let CycleOutcome::Updated(report) = outcome {
            print_cycle(&output, state, report);
        }
    });

    tokio::select! {
        _ = watch => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping");
        }
    }
    Ok(())
}

fn print_cycle(output: &OutputArgs, state: &MonitorState, report: &CycleReport) {
    if output.format != OutputFormat::Json {
        let mut summary = format!("{} processes", report.processes);
        if !report.reconcile.stopped.is_empty() {
            summary.push_str(&format!(", {} stopped", report.reconcile.stopped.len()));
        }
        if !report.reconcile.culled.is_empty() {
            summary.push_str(&format!(", {} removed", report.reconcile.culled.len()));
        }
        if !report.skipped.is_empty() {
            summary.push_str(&format!(", {} skipped", report.skipped.len()));
        }
        println!(
            "\n{} {}",
            style(format!("Cycle {}", report.index)).bold(),
            style(summary).dim()
        );
    }

    match render(output, state, report.tree.as_ref()) {
        Ok(output) => println!("{output}"),
        Err(err) => error!("{err:#}"),
    }
}
