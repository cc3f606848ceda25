//! Terminal presentation of the accumulated state

mod format;
mod process;
mod table;
mod tree;

pub use process::render_process;
pub use table::render_table;
pub use tree::render_tree;

use crate::cli::{OutputArgs, OutputFormat};
use crate::monitor::{MonitorState, ProcessNode};
use crate::prelude::*;

/// Render the state after a cycle as requested by `output`.
///
/// With a pid, the detail of that process replaces the tree or the table.
pub fn render(
    output: &OutputArgs,
    state: &MonitorState,
    tree: Option<&ProcessNode>,
) -> Result<String> {
    if let Some(pid) = output.pid {
        let Some(process) = state.process(pid) else {
            return Ok(format!("Process {pid} is not tracked"));
        };
        return match output.format {
            OutputFormat::Json => serde_json::to_string_pretty(process)
                .with_context(|| format!("Failed to serialize process {pid}")),
            OutputFormat::Tree | OutputFormat::Table => Ok(render_process(process, output.samples)),
        };
    }

    match output.format {
        OutputFormat::Tree => Ok(match tree {
            Some(tree) => render_tree(tree),
            None => "The master process is not known yet".to_string(),
        }),
        OutputFormat::Table => Ok(render_table(state.processes())),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&tree).context("Failed to serialize the process tree")
        }
    }
}
