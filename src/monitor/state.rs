use std::collections::{BTreeMap, BTreeSet};

use pmon_shared::{BasicInfo, ProcessSnapshot, StatusEntries};

use super::liveness::{LivenessTracker, ReconcileReport, ReportedFiles};
use super::merge::Merge;
use super::record::{CycleContext, ProcessRecord};
use super::tree::{ProcessNode, project};
use crate::config::MonitorSettings;
use crate::prelude::*;

/// Outcome of applying one status snapshot to the accumulated table
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub index: u64,
    /// Number of processes in the accumulated table after the cycle
    pub processes: usize,
    /// Processes whose status could not be merged, left untouched for this cycle
    pub skipped: Vec<u32>,
    pub reconcile: ReconcileReport,
    pub tree: Option<ProcessNode>,
}

/// The accumulated table of processes and the identity of the master process
#[derive(Debug, Default)]
pub struct MonitorState {
    processes: BTreeMap<u32, ProcessRecord>,
    master: Option<BasicInfo>,
    calls: u64,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_master(&mut self, master: BasicInfo) {
        self.master = Some(master);
    }

    pub fn master(&self) -> Option<&BasicInfo> {
        self.master.as_ref()
    }

    pub fn master_pid(&self) -> Option<u32> {
        self.master.as_ref().map(|master| master.pid)
    }

    /// Number of status snapshots applied so far
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn process(&self, pid: u32) -> Option<&ProcessRecord> {
        self.processes.get(&pid)
    }

    pub fn processes(&self) -> &BTreeMap<u32, ProcessRecord> {
        &self.processes
    }

    /// Whether the identity of `pid` is still unknown, i.e. it is not a running process with a
    /// known parent
    pub fn needs_basic_info(&self, pid: u32) -> bool {
        !self
            .processes
            .get(&pid)
            .is_some_and(|process| process.is_running && process.parent_pid.is_some())
    }

    /// Merge one snapshot into the table.
    ///
    /// The merge is applied to a copy of the running record, which is only committed on success.
    /// A pid whose record is dead starts a new record.
    pub fn merge_snapshot(
        &mut self,
        mut snapshot: ProcessSnapshot,
        ctx: &CycleContext,
    ) -> Result<()> {
        let Some(pid) = snapshot.pid else {
            bail!("Cannot track a process status without a pid");
        };

        let record = match self.processes.get(&pid) {
            Some(existing) if existing.is_running => {
                existing.fill_unreported(&mut snapshot);
                let incoming = ProcessRecord::from_snapshot(snapshot, ctx)?;
                let mut merged = existing.clone();
                merged
                    .merge(incoming)
                    .with_context(|| format!("Failed to merge the status of process {pid}"))?;
                merged
            }
            Some(_) => {
                debug!("Process {pid} reappeared after it stopped, tracking it as a new process");
                ProcessRecord::from_snapshot(snapshot, ctx)?
            }
            None => ProcessRecord::from_snapshot(snapshot, ctx)?,
        };
        self.processes.insert(pid, record);
        Ok(())
    }

    /// Run a full cycle over a status snapshot: merge every process, reconcile liveness and
    /// project the tree.
    ///
    /// A rejected entry is skipped like a process whose merge failed: its record, open files
    /// included, is left as it was.
    pub fn apply_status(
        &mut self,
        entries: impl Into<StatusEntries>,
        settings: &MonitorSettings,
    ) -> CycleReport {
        let StatusEntries { snapshots, rejected } = entries.into();
        let ctx = CycleContext {
            index: self.calls,
            master_pid: self.master_pid(),
            history_capacity: settings.history_capacity,
            process_history_keys: &settings.process_history_keys,
            file_history_keys: &settings.file_history_keys,
        };

        let mut reported: ReportedFiles = snapshots
            .iter()
            .filter_map(|snapshot| {
                let files: BTreeSet<String> = snapshot.open_files.keys().cloned().collect();
                snapshot.pid.map(|pid| (pid, files))
            })
            .collect();

        let mut skipped = Vec::new();
        for entry in rejected {
            let Some(pid) = entry.pid else {
                warn!("Ignoring a process status without a pid: {}", entry.error);
                continue;
            };
            error!("Skipping the status of process {pid} for this cycle: {}", entry.error);
            let open_files = self
                .processes
                .get(&pid)
                .map(|process| process.open_files().map(|file| file.name.clone()).collect())
                .unwrap_or_default();
            reported.insert(pid, open_files);
            skipped.push(pid);
        }

        for snapshot in snapshots {
            let pid = snapshot.pid;
            if let Err(err) = self.merge_snapshot(snapshot, &ctx) {
                error!("Skipping a process status for this cycle: {err:#}");
                skipped.extend(pid);
            }
        }

        let reconcile =
            LivenessTracker::new(settings.keep_dead_for).reconcile(&mut self.processes, &reported);
        for pid in &reconcile.stopped {
            debug!("Process {pid} is no longer running");
        }
        for (pid, name) in &reconcile.closed_files {
            debug!("Process {pid} closed {name}");
        }
        if !reconcile.culled.is_empty() {
            debug!("Culled processes {:?}", reconcile.culled);
        }

        let tree = project(&self.processes, &settings.tree_keys);

        let report = CycleReport {
            index: self.calls,
            processes: self.processes.len(),
            skipped,
            reconcile,
            tree,
        };
        self.calls += 1;
        report
    }
}
