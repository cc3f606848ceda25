//! Reconciliation of successive process-monitor snapshots into an accumulated table of
//! processes, with bounded histories and a tree view rooted at the master process.

pub mod history;
pub mod liveness;
pub mod merge;
pub mod poller;
pub mod record;
pub mod source;
pub mod state;
pub mod tree;

pub use poller::{CycleOutcome, Poller, PollerState};
pub use source::SnapshotSource;
pub use state::{CycleReport, MonitorState};
pub use tree::ProcessNode;
