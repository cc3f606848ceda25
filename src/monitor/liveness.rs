use std::collections::{BTreeMap, BTreeSet};

use super::record::ProcessRecord;

/// Pids and file names reported by the latest snapshot
pub type ReportedFiles = BTreeMap<u32, BTreeSet<String>>;

/// Transitions detected while reconciling the accumulated table with a snapshot
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Processes that were running and are no longer reported
    pub stopped: Vec<u32>,
    /// Files that were open and are no longer reported, as `(pid, name)`
    pub closed_files: Vec<(u32, String)>,
    /// Processes removed from the table
    pub culled: Vec<u32>,
}

/// Flags processes and files that disappeared from the snapshot, ages dead processes and
/// culls them, with their descendants, past the retention threshold.
#[derive(Debug, Clone, Copy)]
pub struct LivenessTracker {
    keep_dead_for: u32,
}

impl LivenessTracker {
    pub fn new(keep_dead_for: u32) -> Self {
        Self { keep_dead_for }
    }

    /// Reconcile `processes` with what the snapshot of this cycle reported.
    ///
    /// Must run after every process of the snapshot has been merged.
    pub fn reconcile(
        &self,
        processes: &mut BTreeMap<u32, ProcessRecord>,
        reported: &ReportedFiles,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for process in processes.values_mut() {
            if process.is_running && !reported.contains_key(&process.pid) {
                process.is_running = false;
                report.stopped.push(process.pid);
            }
        }

        for process in processes.values_mut() {
            let reported_files = reported.get(&process.pid);
            for file in process.files.values_mut().filter(|file| file.is_open) {
                if !reported_files.is_some_and(|names| names.contains(&file.name)) {
                    file.is_open = false;
                    report.closed_files.push((process.pid, file.name.clone()));
                }
            }
        }

        let mut expired = Vec::new();
        for process in processes.values_mut().filter(|process| !process.is_running) {
            let age = process.age.map_or(1, |age| age + 1);
            process.age = Some(age);
            if age > self.keep_dead_for {
                expired.push(process.pid);
            }
        }

        let to_cull = collect_descendants(processes, expired);
        processes.retain(|pid, _| !to_cull.contains(pid));
        report.culled = to_cull.into_iter().collect();

        report
    }
}

/// `roots` and every process whose ancestry leads to one of them through `parent_pid`
fn collect_descendants(
    processes: &BTreeMap<u32, ProcessRecord>,
    roots: Vec<u32>,
) -> BTreeSet<u32> {
    let mut marked: BTreeSet<u32> = roots.iter().copied().collect();
    let mut pending = roots;

    while let Some(parent) = pending.pop() {
        for child in processes
            .values()
            .filter(|process| process.parent_pid == Some(parent))
        {
            if marked.insert(child.pid) {
                pending.push(child.pid);
            }
        }
    }

    marked
}
