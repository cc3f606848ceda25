use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of a single monitored process, as returned by `GET /basic[/{pid}]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_pid: Option<u32>,
    /// Command line, usually a list of arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Any other field reported by the monitor
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
