use crate::VERSION;
use crate::local_logger::PMON_U8_COLOR_CODE;
use crate::prelude::*;
use clap::Args;
use clap::ValueEnum;
use console::style;

pub(crate) fn show_banner(url: &str) {
    println!(
        "{} {}",
        style(format!("pmon v{VERSION}"))
            .bold()
            .color256(PMON_U8_COLOR_CODE),
        style(format!("watching {url}")).dim()
    );
    debug!("pmon v{VERSION}");
}

/// Monitoring settings, shared between the watch and status commands.
///
/// Every option left unset falls back to the configuration file, then to the defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct MonitorArgs {
    /// Delay between two poll cycles, in milliseconds [default: 1000]
    #[arg(long, env = "PMON_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Number of samples kept in every process and descriptor history [default: 100]
    #[arg(long = "history")]
    pub history_capacity: Option<usize>,

    /// Number of poll cycles a dead process is kept before it is removed, with its
    /// descendants [default: 10]
    #[arg(long)]
    pub keep_dead_for: Option<u32>,

    /// Process fields sampled into the process history, comma separated
    #[arg(long, value_delimiter = ',')]
    pub process_history_keys: Option<Vec<String>>,

    /// Descriptor fields sampled into the descriptor history, comma separated
    #[arg(long, value_delimiter = ',')]
    pub file_history_keys: Option<Vec<String>>,

    /// Process fields shown on the nodes of the process tree, comma separated
    #[arg(long, value_delimiter = ',')]
    pub tree_keys: Option<Vec<String>>,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Process tree rooted at the master process
    #[default]
    Tree,
    /// One row per tracked process
    Table,
    /// The process tree as JSON, or the full record of the process selected with --pid
    Json,
}

pub const DEFAULT_DETAIL_SAMPLES: usize = 10;

/// What gets printed after a poll cycle
#[derive(Args, Debug, Clone, Copy, PartialEq)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Show the history and the files of this process instead of the whole tree
    #[arg(long)]
    pub pid: Option<u32>,

    /// Number of recent history samples shown with --pid
    #[arg(long, default_value_t = DEFAULT_DETAIL_SAMPLES, requires = "pid")]
    pub samples: usize,
}
