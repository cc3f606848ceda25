use console::style;
use serde_json::Value;

use super::format::format_attribute;
use crate::monitor::history::{HistoryBuffer, HistorySample};
use crate::monitor::record::{DescriptorRecord, ProcessRecord};

const HEADER_KEYS: &[&str] = &["is_master", "is_running", "parent_pid", "age", "cmdline"];
const DESCRIPTOR_KEYS: &[&str] = &["type", "read_only", "flags", "pos", "size", "time_of_stat"];

/// Render one process with its `samples` most recent history samples and every file it
/// opened, closed ones included
pub fn render_process(process: &ProcessRecord, samples: usize) -> String {
    let mut lines = vec![header_line(process)];

    let shown = samples.min(process.history.len());
    lines.push(format!(
        "history ({shown} of {} samples)",
        process.history.len()
    ));
    push_samples(&process.history, samples, "  ", &mut lines);

    if !process.files.is_empty() {
        lines.push("files".to_string());
    }
    for file in process.files.values() {
        let status = if file.is_open {
            style("open").green()
        } else {
            style("closed").red()
        };
        lines.push(format!("  {} {status}", file.name));
        for descriptor in file.descriptors.values() {
            lines.push(format!("    {}", descriptor_line(descriptor)));
            push_samples(&descriptor.history, samples, "      ", &mut lines);
        }
    }

    lines.join("\n")
}

fn header_line(process: &ProcessRecord) -> String {
    let mut parts = vec![style(process.pid).bold().to_string()];
    parts.extend(HEADER_KEYS.iter().filter_map(|key| {
        let value = process.field(key)?;
        format_attribute(key, &value)
    }));
    parts.join(" ")
}

fn descriptor_line(descriptor: &DescriptorRecord) -> String {
    let mut parts = vec![style(&descriptor.id).bold().to_string()];
    parts.extend(DESCRIPTOR_KEYS.iter().filter_map(|key| {
        let value = descriptor.field(key)?;
        format_attribute(key, &value)
    }));
    parts.join(" ")
}

fn push_samples(
    history: &HistoryBuffer<HistorySample>,
    count: usize,
    indent: &str,
    lines: &mut Vec<String>,
) {
    for sample in history.recent(count) {
        let mut parts = vec![style(format!("#{}", sample.index)).dim().to_string()];
        parts.extend(
            sample
                .time
                .and_then(|time| format_attribute("time", &Value::from(time))),
        );
        parts.extend(
            sample
                .values
                .iter()
                .filter_map(|(key, value)| format_attribute(key, value)),
        );
        lines.push(format!("{indent}{}", parts.join(" ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorSettings;
    use crate::monitor::MonitorState;
    use pmon_shared::ProcessSnapshot;
    use serde_json::json;

    fn tracked_state() -> MonitorState {
        let settings = MonitorSettings::test(10, 10);
        let mut state = MonitorState::new();
        for status in [
            json!({
                "pid": 4242,
                "parent_pid": 1,
                "time": 10.0,
                "cpu_percent": 1.0,
                "memory_rss": 1024,
                "cmdline": ["flow", "run"],
                "open_files": {
                    "/tmp/log": { "3": { "type": "data", "pos": 0, "size": 10 } },
                    "/tmp/old": { "4": { "pos": 7 } }
                }
            }),
            json!({
                "pid": 4242,
                "time": 11.0,
                "cpu_percent": 2.5,
                "memory_rss": 2048,
                "open_files": { "/tmp/log": { "3": { "pos": 5, "size": 20 } } }
            }),
        ] {
            let snapshot: ProcessSnapshot = serde_json::from_value(status).unwrap();
            state.apply_status(vec![snapshot], &settings);
        }
        state
    }

    #[test]
    fn test_render_process() {
        console::set_colors_enabled(false);
        let state = tracked_state();

        insta::assert_snapshot!(render_process(state.process(4242).unwrap(), 5), @r###"
        4242 running parent_pid=1 flow run
        history (2 of 2 samples)
          #0 time=10.0 cpu_percent=1.0% memory_rss=1 KB
          #1 time=11.0 cpu_percent=2.5% memory_rss=2 KB
        files
          /tmp/log open
            3 type=data pos=5 size=20 B
              #0 time=10.0 pos=0 size=10 B
              #1 time=11.0 pos=5 size=20 B
          /tmp/old closed
            4 pos=7
              #0 time=10.0 pos=7
        "###);
    }

    #[test]
    fn test_render_process_limits_the_samples() {
        console::set_colors_enabled(false);
        let state = tracked_state();

        let output = render_process(state.process(4242).unwrap(), 1);
        assert!(output.contains("history (1 of 2 samples)"));
        assert!(output.contains("#1 time=11.0 cpu_percent=2.5%"));
        assert!(!output.contains("#0 time=10.0 cpu_percent"));
        // Descriptor histories are limited the same way
        assert!(output.contains("      #1 time=11.0 pos=5 size=20 B"));
        assert!(!output.contains("#0 time=10.0 pos=0"));
    }
}
