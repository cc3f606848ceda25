use std::{
    env, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::prelude::*;
use nestify::nest;
use serde::{Deserialize, Serialize};

pub mod merger;

pub use merger::ConfigMerger;

pub const DEFAULT_MONITOR_URL: &str = "http://localhost:8889/";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_KEEP_DEAD_FOR: u32 = 10;

/// Process fields sampled into the process history on every cycle
pub const DEFAULT_PROCESS_HISTORY_KEYS: &[&str] = &[
    "time",
    "memory_percent",
    "memory_vms",
    "memory_rss",
    "cpu_user",
    "cpu_system",
    "cpu_percent",
];

/// Descriptor fields sampled into the descriptor history on every cycle
pub const DEFAULT_FILE_HISTORY_KEYS: &[&str] = &["pos", "size", "time_of_stat"];

/// Process fields exposed on the nodes of the process tree
pub const DEFAULT_TREE_KEYS: &[&str] = &["cpu_percent", "memory_rss", "is_running", "is_master"];

nest! {
    #[derive(Debug, Default, Deserialize, Serialize, PartialEq)]*
    #[serde(default, rename_all = "kebab-case")]*
    /// Persistent configuration of the pmon client.
    ///
    /// Usually stored at `~/.config/pmon/config.yaml`. Every field is optional, command line
    /// arguments take precedence over the values found here, see [`ConfigMerger`].
    pub struct PmonConfig {
        /// Base URL of the process monitor
        pub url: Option<String>,
        pub polling: pub struct PollingConfig {
            pub interval_ms: Option<u64>,
        },
        pub history: pub struct HistoryConfig {
            pub capacity: Option<usize>,
            pub process_keys: Option<Vec<String>>,
            pub file_keys: Option<Vec<String>>,
        },
        pub retention: pub struct RetentionConfig {
            /// Number of poll cycles a dead process is kept before being culled
            pub keep_dead_for: Option<u32>,
        },
        pub tree: pub struct TreeConfig {
            pub keys: Option<Vec<String>>,
        },
    }
}

/// Get the path to the configuration file, following the XDG Base Directory Specification
/// at https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
///
/// If config_name is None, returns ~/.config/pmon/config.yaml (default)
/// If config_name is Some, returns ~/.config/pmon/{config_name}.yaml
fn get_configuration_file_path(config_name: Option<&str>) -> Result<PathBuf> {
    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(config_home) => PathBuf::from(config_home),
        Err(_) => {
            let home = env::var("HOME").context("HOME env variable not set")?;
            PathBuf::from(home).join(".config")
        }
    };
    let config_dir = config_dir.join("pmon");

    Ok(match config_name {
        Some(name) => config_dir.join(format!("{name}.yaml")),
        None => config_dir.join("config.yaml"),
    })
}

impl PmonConfig {
    /// Load the configuration.
    ///
    /// An explicit `config_path` must exist. Otherwise the file is looked up in the user
    /// configuration directory, and a default configuration is returned if it does not exist.
    pub fn load(config_path: Option<&Path>, config_name: Option<&str>) -> Result<Self> {
        if let Some(config_path) = config_path {
            let expanded = PathBuf::from(shellexpand::tilde(&config_path.to_string_lossy()).as_ref());
            let content = fs::read(&expanded)
                .with_context(|| format!("Failed to read config file at {}", expanded.display()))?;
            return Self::parse(&content, &expanded);
        }

        let config_path = get_configuration_file_path(config_name)?;
        match fs::read(&config_path) {
            Ok(content) => Self::parse(&content, &config_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                Ok(PmonConfig::default())
            }
            Err(e) => bail!("Failed to load config: {e}"),
        }
    }

    fn parse(content: &[u8], path: &Path) -> Result<Self> {
        let config: PmonConfig = serde_yaml::from_slice(content)
            .with_context(|| format!("Failed to parse pmon config at {}", path.display()))?;
        debug!("Config loaded from {}", path.display());
        Ok(config)
    }
}

/// Resolved settings of the monitoring engine
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Maximum number of samples kept in every history buffer
    pub history_capacity: NonZeroUsize,
    /// A dead process is culled once its age exceeds this number of cycles
    pub keep_dead_for: u32,
    pub process_history_keys: Vec<String>,
    pub file_history_keys: Vec<String>,
    pub tree_keys: Vec<String>,
}

fn to_owned_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: NonZeroUsize::new(DEFAULT_HISTORY_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            keep_dead_for: DEFAULT_KEEP_DEAD_FOR,
            process_history_keys: to_owned_keys(DEFAULT_PROCESS_HISTORY_KEYS),
            file_history_keys: to_owned_keys(DEFAULT_FILE_HISTORY_KEYS),
            tree_keys: to_owned_keys(DEFAULT_TREE_KEYS),
        }
    }
}

#[cfg(test)]
impl MonitorSettings {
    /// Settings with a small history and retention, and no delay between cycles
    pub fn test(history_capacity: usize, keep_dead_for: u32) -> Self {
        Self {
            poll_interval: Duration::ZERO,
            history_capacity: NonZeroUsize::new(history_capacity).unwrap(),
            keep_dead_for,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deserialize_full_config() {
        let yaml = r#"
url: http://worker-3:8889/
polling:
  interval-ms: 500
history:
  capacity: 20
  process-keys: [cpu_percent]
retention:
  keep-dead-for: 3
tree:
  keys: [cpu_percent, is_running]
"#;
        let config: PmonConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.url.as_deref(), Some("http://worker-3:8889/"));
        assert_eq!(config.polling.interval_ms, Some(500));
        assert_eq!(config.history.capacity, Some(20));
        assert_eq!(config.history.process_keys, Some(vec!["cpu_percent".into()]));
        assert_eq!(config.history.file_keys, None);
        assert_eq!(config.retention.keep_dead_for, Some(3));
        assert_eq!(
            config.tree.keys,
            Some(vec!["cpu_percent".into(), "is_running".into()])
        );
    }

    #[test]
    fn test_deserialize_empty_config() {
        let config: PmonConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PmonConfig::default());
    }

    #[test]
    fn test_load_missing_default_config() {
        let temp_dir = TempDir::new().unwrap();
        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            let config = PmonConfig::load(None, None).unwrap();
            assert_eq!(config, PmonConfig::default());
        });
    }

    #[test]
    fn test_load_named_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("pmon");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("cluster.yaml"),
            "retention:\n  keep-dead-for: 2\n",
        )
        .unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            let config = PmonConfig::load(None, Some("cluster")).unwrap();
            assert_eq!(config.retention.keep_dead_for, Some(2));

            // The default file does not exist
            let config = PmonConfig::load(None, None).unwrap();
            assert_eq!(config.retention.keep_dead_for, None);
        });
    }

    #[test]
    fn test_load_explicit_path_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.yaml");

        let err = PmonConfig::load(Some(&missing), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pmon.yaml");
        fs::write(&path, "history:\n  capacity: many\n").unwrap();

        let err = PmonConfig::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("Failed to parse pmon config"));
    }
}
