mod basic;
mod shared;
mod status;
mod watch;

pub use shared::*;

use std::path::PathBuf;

use crate::{
    config::{ConfigMerger, PmonConfig},
    local_logger::{PMON_U8_COLOR_CODE, init_local_logger},
    monitor_client::MonitorClient,
    prelude::*,
};
use clap::{
    Parser, Subcommand,
    builder::{Styles, styling},
};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::Ansi256Color(PMON_U8_COLOR_CODE).on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Watch the processes of a process monitor", styles = create_styles())]
pub struct Cli {
    /// Base URL of the process monitor [default: http://localhost:8889/]
    #[arg(long, env = "PMON_URL", global = true)]
    pub url: Option<String>,

    /// The configuration name to use
    /// If provided, the configuration will be loaded from ~/.config/pmon/{config-name}.yaml
    /// Otherwise, loads from ~/.config/pmon/config.yaml
    #[arg(long, env = "PMON_CONFIG_NAME", global = true)]
    pub config_name: Option<String>,

    /// Path to a configuration file, used instead of the one in ~/.config/pmon
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the monitor continuously and print the process tree after every cycle
    #[command(alias = "w")]
    Watch(watch::WatchArgs),
    /// Poll the monitor once and print the processes
    Status(status::StatusArgs),
    /// Print the identity of a process, or of the master process
    Basic(basic::BasicArgs),
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_local_logger()?;

    let config = PmonConfig::load(cli.config.as_deref(), cli.config_name.as_deref())?;
    let url = ConfigMerger::merge_url(cli.url.as_deref(), &config);
    let client = MonitorClient::new(&url)?;
    debug!("Using the monitor at {}", client.base_url());

    match cli.command {
        Commands::Watch(args) => {
            let settings = ConfigMerger::merge_monitor_settings(&args.monitor, &config)?;
            watch::run(args, client, settings).await?
        }
        Commands::Status(args) => {
            let settings = ConfigMerger::merge_monitor_settings(&args.monitor, &config)?;
            status::run(args, client, settings).await?
        }
        Commands::Basic(args) => basic::run(args, &client).await?,
    }
    Ok(())
}
