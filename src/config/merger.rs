use std::num::NonZeroUsize;
use std::time::Duration;

use crate::cli::MonitorArgs;
use crate::prelude::*;

use super::{DEFAULT_MONITOR_URL, MonitorSettings, PmonConfig};

/// Handles merging of CLI arguments with the persistent configuration
///
/// Implements the precedence rule: CLI > config > default
pub struct ConfigMerger;

impl ConfigMerger {
    /// Resolve the monitor URL
    pub fn merge_url(cli_url: Option<&str>, config: &PmonConfig) -> String {
        cli_url
            .map(str::to_owned)
            .or_else(|| config.url.clone())
            .unwrap_or_else(|| DEFAULT_MONITOR_URL.to_owned())
    }

    /// Resolve the monitoring settings and validate them
    pub fn merge_monitor_settings(
        cli: &MonitorArgs,
        config: &PmonConfig,
    ) -> Result<MonitorSettings> {
        let defaults = MonitorSettings::default();

        let interval_ms = cli.interval_ms.or(config.polling.interval_ms);
        let poll_interval = match interval_ms {
            Some(0) => bail!("The poll interval must be greater than 0 ms"),
            Some(interval_ms) => Duration::from_millis(interval_ms),
            None => defaults.poll_interval,
        };

        let history_capacity = match cli.history_capacity.or(config.history.capacity) {
            Some(capacity) => NonZeroUsize::new(capacity)
                .ok_or_else(|| anyhow!("The history capacity must be greater than 0"))?,
            None => defaults.history_capacity,
        };

        Ok(MonitorSettings {
            poll_interval,
            history_capacity,
            keep_dead_for: cli
                .keep_dead_for
                .or(config.retention.keep_dead_for)
                .unwrap_or(defaults.keep_dead_for),
            process_history_keys: Self::merge_keys(
                &cli.process_history_keys,
                config.history.process_keys.as_ref(),
                defaults.process_history_keys,
            ),
            file_history_keys: Self::merge_keys(
                &cli.file_history_keys,
                config.history.file_keys.as_ref(),
                defaults.file_history_keys,
            ),
            tree_keys: Self::merge_keys(
                &cli.tree_keys,
                config.tree.keys.as_ref(),
                defaults.tree_keys,
            ),
        })
    }

    /// Helper to merge key lists with precedence: CLI > config > default
    fn merge_keys(
        cli_value: &Option<Vec<String>>,
        config_value: Option<&Vec<String>>,
        default: Vec<String>,
    ) -> Vec<String> {
        cli_value
            .clone()
            .or_else(|| config_value.cloned())
            .unwrap_or(default)
    }
}
