use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use pmon_shared::{DescriptorSnapshot, ProcessSnapshot};
use serde::Serialize;
use serde_json::Value;

use super::history::{HistoryBuffer, HistorySample};
use super::merge::{Attributes, Merge, keep_first, keep_unreported, merge_attributes};
use crate::prelude::*;

/// Fields owned by the reconciliation engine, never taken from the monitor's attributes
const ENGINE_FIELDS: &[&str] = &["is_running", "is_master", "age", "history", "files"];

/// Everything a snapshot needs to become a record for the current poll cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub index: u64,
    pub master_pid: Option<u32>,
    pub history_capacity: NonZeroUsize,
    pub process_history_keys: &'a [String],
    pub file_history_keys: &'a [String],
}

/// Accumulated state of one monitored process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_pid: Option<u32>,
    pub is_master: bool,
    pub is_running: bool,
    /// Consecutive poll cycles since the process was last seen running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(flatten)]
    pub attributes: Attributes,
    pub history: HistoryBuffer<HistorySample>,
    pub files: BTreeMap<String, FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub is_open: bool,
    pub descriptors: BTreeMap<String, DescriptorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptorRecord {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_stat: Option<f64>,
    #[serde(flatten)]
    pub attributes: Attributes,
    pub history: HistoryBuffer<HistorySample>,
}

fn build_sample(
    index: u64,
    time: Option<f64>,
    keys: &[String],
    field: impl Fn(&str) -> Option<Value>,
) -> HistorySample {
    let values = keys
        .iter()
        // Already carried by the sample itself
        .filter(|key| !matches!(key.as_str(), "index" | "time"))
        .filter_map(|key| field(key).map(|value| (key.clone(), value)))
        .collect();
    HistorySample {
        index,
        time,
        values,
    }
}

impl ProcessRecord {
    /// Initialize a record from a freshly fetched snapshot.
    ///
    /// The record is running, flagged as master if its pid is the master pid, its open files
    /// are converted to [`FileRecord`]s and one sample is appended to every history.
    pub fn from_snapshot(snapshot: ProcessSnapshot, ctx: &CycleContext) -> Result<Self> {
        let pid = snapshot
            .pid
            .ok_or_else(|| anyhow!("Cannot track a process status without a pid"))?;

        let time = snapshot.time.flatten();
        let mut attributes = snapshot.fields;
        for field in ENGINE_FIELDS {
            attributes.shift_remove(*field);
        }

        let files = snapshot
            .open_files
            .into_iter()
            .map(|(name, descriptors)| {
                let descriptors = descriptors
                    .into_iter()
                    .map(|(id, descriptor)| {
                        let record =
                            DescriptorRecord::from_snapshot(id.clone(), descriptor, time, ctx);
                        (id, record)
                    })
                    .collect();
                let file = FileRecord {
                    name: name.clone(),
                    is_open: true,
                    descriptors,
                };
                (name, file)
            })
            .collect();

        let mut record = ProcessRecord {
            pid,
            parent_pid: snapshot.parent_pid.flatten(),
            is_master: ctx.master_pid == Some(pid),
            is_running: true,
            age: None,
            time,
            attributes,
            history: HistoryBuffer::new(ctx.history_capacity),
            files,
        };
        let sample = build_sample(ctx.index, record.time, ctx.process_history_keys, |key| {
            record.field(key)
        });
        record.history.append(sample);

        Ok(record)
    }

    /// Value of a field by name, typed fields first then attributes
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "pid" => Some(self.pid.into()),
            "parent_pid" => self.parent_pid.map(Value::from),
            "is_master" => Some(self.is_master.into()),
            "is_running" => Some(self.is_running.into()),
            "age" => self.age.map(Value::from),
            "time" => self.time.map(Value::from),
            _ => self.attributes.get(key).cloned(),
        }
    }

    pub fn open_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values().filter(|file| file.is_open)
    }

    /// Resolve the typed fields `snapshot` does not report to their value in this record.
    ///
    /// Only the fields reported as `null` are cleared by the merge that follows.
    pub fn fill_unreported(&self, snapshot: &mut ProcessSnapshot) {
        keep_unreported(&mut snapshot.parent_pid, self.parent_pid);
        keep_unreported(&mut snapshot.time, self.time);

        for (name, descriptors) in &mut snapshot.open_files {
            let Some(file) = self.files.get(name).filter(|file| file.is_open) else {
                continue;
            };
            for (id, descriptor) in descriptors.iter_mut() {
                if let Some(existing) = file.descriptors.get(id) {
                    keep_unreported(&mut descriptor.pos, existing.pos);
                    keep_unreported(&mut descriptor.size, existing.size);
                    keep_unreported(&mut descriptor.time_of_stat, existing.time_of_stat);
                }
            }
        }
    }
}

/// Typed scalars of `incoming` replace the existing ones, resolve the unreported ones first
/// with [`ProcessRecord::fill_unreported`].
impl Merge for ProcessRecord {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        merge_attributes(&mut self.attributes, incoming.attributes)?;
        self.files.merge(incoming.files)?;
        self.history.merge(incoming.history)?;

        self.parent_pid = incoming.parent_pid;
        self.time = incoming.time;
        self.is_master = incoming.is_master;
        self.is_running = incoming.is_running;
        self.age = incoming.age;
        Ok(())
    }
}

impl Merge for FileRecord {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        // A closed file reported open again is a new file under the same name
        if !self.is_open && incoming.is_open {
            *self = incoming;
            return Ok(());
        }

        self.is_open = incoming.is_open;
        self.descriptors.merge(incoming.descriptors)
    }
}

impl DescriptorRecord {
    fn from_snapshot(
        id: String,
        snapshot: DescriptorSnapshot,
        time: Option<f64>,
        ctx: &CycleContext,
    ) -> Self {
        let mut record = DescriptorRecord {
            id,
            kind: snapshot.kind,
            read_only: snapshot.read_only,
            flags: snapshot.flags,
            pos: snapshot.pos.flatten(),
            size: snapshot.size.flatten(),
            time_of_stat: snapshot.time_of_stat.flatten(),
            attributes: snapshot.fields,
            history: HistoryBuffer::new(ctx.history_capacity),
        };
        let sample = build_sample(ctx.index, time, ctx.file_history_keys, |key| {
            record.field(key)
        });
        record.history.append(sample);
        record
    }

    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(self.id.clone().into()),
            "type" => self.kind.clone().map(Value::from),
            "read_only" => self.read_only.map(Value::from),
            "flags" => self.flags.map(Value::from),
            "pos" => self.pos.map(Value::from),
            "size" => self.size.map(Value::from),
            "time_of_stat" => self.time_of_stat.map(Value::from),
            _ => self.attributes.get(key).cloned(),
        }
    }
}

impl Merge for DescriptorRecord {
    fn merge(&mut self, incoming: Self) -> Result<()> {
        merge_attributes(&mut self.attributes, incoming.attributes)?;
        self.history.merge(incoming.history)?;

        keep_first(&mut self.kind, incoming.kind);
        keep_first(&mut self.read_only, incoming.read_only);
        keep_first(&mut self.flags, incoming.flags);
        self.pos = incoming.pos;
        self.size = incoming.size;
        self.time_of_stat = incoming.time_of_stat;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> ProcessSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn test_from_snapshot_initializes_the_record() {
        let process_keys = keys(&["time", "cpu_percent", "memory_rss", "missing"]);
        let file_keys = keys(&["pos", "size"]);
        let ctx = CycleContext {
            index: 4,
            master_pid: Some(100),
            history_capacity: NonZeroUsize::new(10).unwrap(),
            process_history_keys: &process_keys,
            file_history_keys: &file_keys,
        };

        let record = ProcessRecord::from_snapshot(
            snapshot(json!({
                "pid": 100,
                "parent_pid": 1,
                "time": 50.0,
                "cpu_percent": 3.5,
                "memory_rss": 4096,
                "is_running": false,
                "open_files": {
                    "/tmp/out": { "4": { "type": "data", "pos": 12, "size": 100 } }
                }
            })),
            &ctx,
        )
        .unwrap();

        assert!(record.is_running);
        assert!(record.is_master);
        assert_eq!(record.age, None);
        assert!(!record.attributes.contains_key("is_running"));

        insta::assert_json_snapshot!(record, @r###"
        {
          "pid": 100,
          "parent_pid": 1,
          "is_master": true,
          "is_running": true,
          "time": 50.0,
          "cpu_percent": 3.5,
          "memory_rss": 4096,
          "history": [
            {
              "index": 4,
              "time": 50.0,
              "cpu_percent": 3.5,
              "memory_rss": 4096
            }
          ],
          "files": {
            "/tmp/out": {
              "name": "/tmp/out",
              "is_open": true,
              "descriptors": {
                "4": {
                  "id": "4",
                  "type": "data",
                  "pos": 12,
                  "size": 100,
                  "history": [
                    {
                      "index": 4,
                      "time": 50.0,
                      "pos": 12,
                      "size": 100
                    }
                  ]
                }
              }
            }
          }
        }
        "###);
    }

    #[test]
    fn test_from_snapshot_requires_a_pid() {
        let ctx = CycleContext {
            index: 0,
            master_pid: None,
            history_capacity: NonZeroUsize::MIN,
            process_history_keys: &[],
            file_history_keys: &[],
        };
        assert!(ProcessRecord::from_snapshot(ProcessSnapshot::default(), &ctx).is_err());
    }

    #[test]
    fn test_descriptor_metadata_is_kept_from_first_sight() {
        let ctx = CycleContext {
            index: 0,
            master_pid: None,
            history_capacity: NonZeroUsize::MIN,
            process_history_keys: &[],
            file_history_keys: &[],
        };
        let first = DescriptorSnapshot {
            kind: Some("ASCII text".into()),
            read_only: Some(true),
            flags: Some(32768),
            pos: Some(Some(0)),
            ..Default::default()
        };
        let second = DescriptorSnapshot {
            kind: Some("data".into()),
            read_only: Some(false),
            flags: Some(1),
            pos: Some(Some(512)),
            ..Default::default()
        };

        let mut record = DescriptorRecord::from_snapshot("3".into(), first, None, &ctx);
        record
            .merge(DescriptorRecord::from_snapshot("3".into(), second, None, &ctx))
            .unwrap();

        assert_eq!(record.kind.as_deref(), Some("ASCII text"));
        assert_eq!(record.read_only, Some(true));
        assert_eq!(record.flags, Some(32768));
        assert_eq!(record.pos, Some(512));
    }

    #[test]
    fn test_null_clears_typed_fields_and_absence_keeps_them() {
        let ctx = CycleContext {
            index: 0,
            master_pid: None,
            history_capacity: NonZeroUsize::MIN,
            process_history_keys: &[],
            file_history_keys: &[],
        };
        let mut record = ProcessRecord::from_snapshot(
            snapshot(json!({
                "pid": 1,
                "parent_pid": 5,
                "time": 1.0,
                "open_files": { "/f": { "3": { "pos": 40, "size": 9, "time_of_stat": 1.0 } } }
            })),
            &ctx,
        )
        .unwrap();

        let mut absent = snapshot(json!({ "pid": 1, "open_files": { "/f": { "3": {} } } }));
        record.fill_unreported(&mut absent);
        record
            .merge(ProcessRecord::from_snapshot(absent, &ctx).unwrap())
            .unwrap();
        assert_eq!(record.parent_pid, Some(5));
        assert_eq!(record.time, Some(1.0));
        let descriptor = &record.files["/f"].descriptors["3"];
        assert_eq!(descriptor.pos, Some(40));
        assert_eq!(descriptor.size, Some(9));

        let mut null = snapshot(json!({
            "pid": 1,
            "parent_pid": null,
            "time": null,
            "open_files": { "/f": { "3": { "pos": null, "size": null, "time_of_stat": null } } }
        }));
        record.fill_unreported(&mut null);
        record
            .merge(ProcessRecord::from_snapshot(null, &ctx).unwrap())
            .unwrap();
        assert_eq!(record.parent_pid, None);
        assert_eq!(record.time, None);
        let descriptor = &record.files["/f"].descriptors["3"];
        assert_eq!(descriptor.pos, None);
        assert_eq!(descriptor.size, None);
        assert_eq!(descriptor.time_of_stat, None);
    }
}
