use futures::future::join_all;
use pmon_shared::{BasicInfo, ProcessSnapshot};
use serde_json::Value;

use super::source::SnapshotSource;
use super::state::{CycleReport, MonitorState};
use crate::config::MonitorSettings;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    AwaitingSnapshot,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Updated(CycleReport),
    /// The status could not be fetched, the accumulated table is unchanged
    Failed(Error),
}

/// Drives the poll cycles against a [`SnapshotSource`] and owns the accumulated state
pub struct Poller<S> {
    source: S,
    settings: MonitorSettings,
    state: MonitorState,
    phase: PollerState,
}

impl<S: SnapshotSource> Poller<S> {
    pub fn new(source: S, settings: MonitorSettings) -> Self {
        Self {
            source,
            settings,
            state: MonitorState::new(),
            phase: PollerState::Idle,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> PollerState {
        self.phase
    }

    /// Fetch the identity of the master process
    pub async fn resolve_master(&mut self) -> Result<()> {
        start_group!("Resolving the master process");
        let master = self.source.get_basic(None).await;
        end_group!();

        let master = master.context("Failed to resolve the master process")?;
        info!("Monitoring master process {}", master.pid);
        self.state.set_master(master);
        Ok(())
    }

    /// Run one poll cycle.
    ///
    /// The master identity is resolved first if it is still unknown. A failed identity
    /// resolution does not prevent the cycle from merging the status.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.state.master_pid().is_none() {
            if let Err(err) = self.resolve_master().await {
                warn!("{err:#}, retrying on the next cycle");
            }
        }

        self.phase = PollerState::AwaitingSnapshot;
        let outcome = match self.source.get_status().await {
            Ok(status) => {
                let mut entries = status.into_snapshots();
                self.enrich(&mut entries.snapshots).await;
                let report = self.state.apply_status(entries, &self.settings);
                debug!(
                    "Cycle {} tracked {} processes",
                    report.index, report.processes
                );
                CycleOutcome::Updated(report)
            }
            Err(err) => {
                warn!("Could not retrieve process status: {err:#}");
                CycleOutcome::Failed(err)
            }
        };
        self.phase = PollerState::Idle;
        outcome
    }

    /// Fill in the identity of the processes whose parent is still unknown
    async fn enrich(&self, snapshots: &mut [ProcessSnapshot]) {
        let master = self.state.master();
        let mut pending = Vec::new();
        for (position, snapshot) in snapshots.iter_mut().enumerate() {
            let Some(pid) = snapshot.pid else { continue };
            if snapshot.parent_pid.flatten().is_some() || !self.state.needs_basic_info(pid) {
                continue;
            }
            match master {
                Some(master) if master.pid == pid => fold_basic_info(snapshot, master.clone()),
                _ => pending.push((position, pid)),
            }
        }
        if pending.is_empty() {
            return;
        }

        trace!("Fetching the identity of {} processes", pending.len());
        let infos = join_all(
            pending
                .iter()
                .map(|(_, pid)| self.source.get_basic(Some(*pid))),
        )
        .await;

        for ((position, pid), info) in pending.into_iter().zip(infos) {
            match info {
                Ok(info) => fold_basic_info(&mut snapshots[position], info),
                Err(err) => debug!("Could not retrieve the identity of process {pid}: {err:#}"),
            }
        }
    }

    /// Poll until `max_cycles` cycles ran, or forever.
    ///
    /// `on_cycle` is called after every cycle with the updated state.
    pub async fn run<F>(&mut self, max_cycles: Option<u64>, mut on_cycle: F)
    where
        F: FnMut(&MonitorState, &CycleOutcome),
    {
        let mut cycles = 0;
        loop {
            let outcome = self.run_cycle().await;
            on_cycle(&self.state, &outcome);

            cycles += 1;
            if max_cycles.is_some_and(|max_cycles| cycles >= max_cycles) {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

fn fold_basic_info(snapshot: &mut ProcessSnapshot, info: BasicInfo) {
    if snapshot.parent_pid.flatten().is_none() && info.parent_pid.is_some() {
        snapshot.parent_pid = Some(info.parent_pid);
    }
    if let Some(cmdline) = info.cmdline {
        snapshot.fields.entry("cmdline").or_insert(cmdline);
    }
    if let Some(working_directory) = info.working_directory {
        snapshot
            .fields
            .entry("working_directory")
            .or_insert(Value::String(working_directory));
    }
}
