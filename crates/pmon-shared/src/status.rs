use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Open files of a process: file name -> descriptor id -> descriptor
pub type OpenFiles = BTreeMap<String, BTreeMap<String, DescriptorSnapshot>>;

/// A typed field as reported by the monitor.
///
/// `None` when the field is absent, `Some(None)` when it is reported as `null`.
pub type Reported<T> = Option<Option<T>>;

fn reported<'de, D, T>(deserializer: D) -> Result<Reported<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `GET /status`.
///
/// The monitor serves a mapping keyed by pid, older monitors serve a plain list. Entries are
/// kept as raw JSON so that a malformed one does not take down the others, see
/// [`StatusResponse::into_snapshots`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusResponse {
    ByPid(Map<String, Value>),
    List(Vec<Value>),
}

/// State of one process at the instant the status was served
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(
        default,
        deserialize_with = "reported",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_pid: Reported<u32>,
    /// Epoch seconds
    #[serde(
        default,
        deserialize_with = "reported",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Reported<f64>,
    #[serde(default)]
    pub open_files: OpenFiles,
    /// Metrics (`cpu_percent`, `memory_rss`, ...) and any other reported field
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DescriptorSnapshot {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<i64>,
    #[serde(
        default,
        deserialize_with = "reported",
        skip_serializing_if = "Option::is_none"
    )]
    pub pos: Reported<i64>,
    #[serde(
        default,
        deserialize_with = "reported",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Reported<u64>,
    #[serde(
        default,
        deserialize_with = "reported",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_of_stat: Reported<f64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An entry of the status that could not be read as a [`ProcessSnapshot`]
#[derive(Debug)]
pub struct RejectedEntry {
    /// Pid of the entry, from its key or its `pid` field, when one can be found
    pub pid: Option<u32>,
    pub error: serde_json::Error,
}

/// Entries of a status response, split between readable snapshots and rejected entries
#[derive(Debug, Default)]
pub struct StatusEntries {
    pub snapshots: Vec<ProcessSnapshot>,
    pub rejected: Vec<RejectedEntry>,
}

impl From<Vec<ProcessSnapshot>> for StatusEntries {
    fn from(snapshots: Vec<ProcessSnapshot>) -> Self {
        StatusEntries {
            snapshots,
            rejected: Vec::new(),
        }
    }
}

impl StatusEntries {
    fn push(&mut self, key: Option<&str>, entry: Value) {
        let key_pid = key.and_then(|key| key.parse::<u32>().ok());
        let pid = entry
            .get("pid")
            .and_then(Value::as_u64)
            .and_then(|pid| u32::try_from(pid).ok())
            .or(key_pid);

        match serde_json::from_value::<ProcessSnapshot>(entry) {
            Ok(mut snapshot) => {
                snapshot.pid = snapshot.pid.or(key_pid);
                if snapshot.pid.is_some() {
                    self.snapshots.push(snapshot);
                } else {
                    self.rejected.push(RejectedEntry {
                        pid: None,
                        error: serde::de::Error::missing_field("pid"),
                    });
                }
            }
            Err(error) => self.rejected.push(RejectedEntry { pid, error }),
        }
    }
}

impl StatusResponse {
    /// Read every entry of the response as a snapshot that carries a pid.
    ///
    /// Entries of a mapping without a `pid` field take it from their key. Entries that do not
    /// match [`ProcessSnapshot`], or for which no pid can be determined, are rejected one by one.
    pub fn into_snapshots(self) -> StatusEntries {
        let mut entries = StatusEntries::default();
        match self {
            StatusResponse::ByPid(by_pid) => {
                for (key, entry) in by_pid {
                    entries.push(Some(&key), entry);
                }
            }
            StatusResponse::List(list) => {
                for entry in list {
                    entries.push(None, entry);
                }
            }
        }
        entries
    }
}
