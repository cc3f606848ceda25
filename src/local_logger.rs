use std::io::{IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use crate::logger::{GroupEvent, get_group_event};
use crate::prelude::*;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use simplelog::{CombinedLogger, SharedLogger};

pub const PMON_U8_COLOR_CODE: u8 = 39; // #00AFFF

lazy_static! {
    /// Spinner of the log group in progress, only ever set on a terminal
    static ref GROUP_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);
    static ref STDOUT_IS_TTY: bool = std::io::stdout().is_terminal();
}

/// Level requested through `PMON_LOG`, `info` when unset or invalid
fn level_from_env() -> LevelFilter {
    std::env::var("PMON_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Errors and warnings go to stderr, debug and trace lines carry their target
fn styled_line(record: &Record) -> (bool, String) {
    let message = record.args().to_string();
    match record.level() {
        Level::Error => (true, Style::new().red().apply_to(message).to_string()),
        Level::Warn => (true, Style::new().yellow().apply_to(message).to_string()),
        Level::Info => (false, message),
        level => {
            let style = if level == Level::Debug {
                Style::new().blue().dim()
            } else {
                Style::new().black().dim()
            };
            let line = format!("[{level}::{}] {message}", record.target());
            (false, style.apply_to(line).to_string())
        }
    }
}

/// Logger of the pmon binary: styled lines, and a spinner while a log group is open
struct TerminalLogger {
    level: LevelFilter,
}

impl Log for TerminalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match get_group_event(record) {
            Some(GroupEvent::Start(name)) => open_group(&name),
            Some(GroupEvent::End) => clean_logger(),
            None => {
                let (to_stderr, line) = styled_line(record);
                let print = || {
                    if to_stderr {
                        eprintln!("{line}");
                    } else {
                        println!("{line}");
                    }
                };
                match GROUP_SPINNER.lock().ok().as_deref() {
                    Some(Some(spinner)) => spinner.suspend(print),
                    _ => print(),
                }
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

impl SharedLogger for TerminalLogger {
    fn level(&self) -> LevelFilter {
        self.level
    }

    fn config(&self) -> Option<&simplelog::Config> {
        None
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

fn open_group(name: &str) {
    if !*STDOUT_IS_TTY {
        println!("{name}...");
        return;
    }

    let spinner = ProgressBar::new_spinner();
    let template = format!(
        "  {{spinner:>.{PMON_U8_COLOR_CODE}}} {{wide_msg:.{PMON_U8_COLOR_CODE}.bold}}"
    );
    if let Ok(style) = ProgressStyle::with_template(&template) {
        spinner.set_style(style);
    }
    spinner.set_message(format!("{name}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    if let Some(previous) = GROUP_SPINNER
        .lock()
        .ok()
        .and_then(|mut current| current.replace(spinner))
    {
        previous.finish_and_clear();
    }
}

pub fn init_local_logger() -> Result<()> {
    let logger: Box<dyn SharedLogger> = Box::new(TerminalLogger {
        level: level_from_env(),
    });
    CombinedLogger::init(vec![logger])?;
    Ok(())
}

/// Clear the spinner of the log group in progress, if any
pub fn clean_logger() {
    if let Some(spinner) = GROUP_SPINNER
        .lock()
        .ok()
        .and_then(|mut current| current.take())
    {
        spinner.finish_and_clear();
    }
}
