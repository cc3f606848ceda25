use console::style;
use itertools::Itertools;
use serde_json::Value;

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Human readable size, with one decimal past the kilobyte and no trailing `.0`
pub(crate) fn format_memory(bytes: f64) -> String {
    let mut value = bytes.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        return format!("{value:.0} B");
    }
    let value = format!("{value:.1}");
    let value = value.strip_suffix(".0").unwrap_or(&value);
    format!("{value} {}", UNITS[unit])
}

pub(crate) fn format_percent(percent: f64) -> String {
    format!("{percent:.1}%")
}

fn is_memory_key(key: &str) -> bool {
    matches!(key, "memory_rss" | "memory_vms" | "size")
}

/// Command line of a process, reported either as a list of arguments or as a string
pub(crate) fn format_cmdline(cmdline: &Value) -> String {
    match cmdline {
        Value::Array(arguments) => arguments.iter().map(format_plain).join(" "),
        other => format_plain(other),
    }
}

fn format_plain(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

/// Format one attribute of a tree node, `None` when there is nothing worth showing
pub(crate) fn format_attribute(key: &str, value: &Value) -> Option<String> {
    match (key, value) {
        (_, Value::Null) => None,
        ("is_running", Value::Bool(true)) => Some(style("running").green().to_string()),
        ("is_running", Value::Bool(false)) => Some(style("stopped").red().to_string()),
        ("is_master", Value::Bool(true)) => Some(style("master").bold().to_string()),
        ("is_master", Value::Bool(false)) => None,
        ("cmdline", cmdline) => Some(style(format_cmdline(cmdline)).dim().to_string()),
        (key, Value::Number(number)) if is_memory_key(key) => {
            Some(format!("{key}={}", format_memory(number.as_f64()?)))
        }
        (key, Value::Number(number)) if key.ends_with("_percent") => {
            Some(format!("{key}={}", format_percent(number.as_f64()?)))
        }
        (key, value) => Some(format!("{key}={}", format_plain(value))),
    }
}
