use std::collections::BTreeMap;

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::format::{format_cmdline, format_memory, format_percent};
use crate::monitor::record::ProcessRecord;

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "PID")]
    pid: u32,
    #[tabled(rename = "PPID")]
    parent_pid: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "RSS")]
    rss: String,
    #[tabled(rename = "Open files")]
    open_files: usize,
    #[tabled(rename = "Command")]
    command: String,
}

impl From<&ProcessRecord> for ProcessRow {
    fn from(process: &ProcessRecord) -> Self {
        let number = |key: &str| process.attributes.get(key).and_then(|value| value.as_f64());
        let status = match (process.is_running, process.age) {
            (true, _) => "running".to_string(),
            (false, Some(age)) => format!("stopped ({age})"),
            (false, None) => "stopped".to_string(),
        };
        let status = if process.is_master {
            format!("{status}, master")
        } else {
            status
        };

        ProcessRow {
            pid: process.pid,
            parent_pid: process
                .parent_pid
                .map_or_else(|| "-".to_string(), |pid| pid.to_string()),
            status,
            cpu: number("cpu_percent").map_or_else(|| "-".to_string(), format_percent),
            rss: number("memory_rss").map_or_else(|| "-".to_string(), format_memory),
            open_files: process.open_files().count(),
            command: process
                .attributes
                .get("cmdline")
                .map(format_cmdline)
                .unwrap_or_default(),
        }
    }
}

/// Render every tracked process as a table row, ordered by pid
pub fn render_table(processes: &BTreeMap<u32, ProcessRecord>) -> String {
    let rows: Vec<ProcessRow> = processes.values().map(ProcessRow::from).collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        // Numeric columns
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()));
    table.to_string()
}
