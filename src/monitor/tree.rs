use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use super::record::ProcessRecord;

/// A process and its children, exposing a whitelist of the process fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessNode {
    pub pid: u32,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ProcessNode::size).sum::<usize>()
    }
}

/// Project the accumulated table into a tree rooted at the master process.
///
/// Returns `None` while no record is flagged as master.
pub fn project(processes: &BTreeMap<u32, ProcessRecord>, keys: &[String]) -> Option<ProcessNode> {
    let master = processes.values().find(|process| process.is_master)?;

    let mut children_of: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for process in processes.values() {
        if let Some(parent_pid) = process.parent_pid {
            // Values are visited in pid order, so children lists are sorted
            children_of.entry(parent_pid).or_default().push(process.pid);
        }
    }

    let mut visited = BTreeSet::new();
    Some(build_node(master, processes, &children_of, keys, &mut visited))
}

fn build_node(
    process: &ProcessRecord,
    processes: &BTreeMap<u32, ProcessRecord>,
    children_of: &BTreeMap<u32, Vec<u32>>,
    keys: &[String],
    visited: &mut BTreeSet<u32>,
) -> ProcessNode {
    visited.insert(process.pid);

    let attributes = keys
        .iter()
        .filter(|key| !matches!(key.as_str(), "pid" | "children"))
        .filter_map(|key| process.field(key).map(|value| (key.clone(), value)))
        .collect();

    let mut children = Vec::new();
    for child_pid in children_of.get(&process.pid).into_iter().flatten() {
        if visited.contains(child_pid) {
            continue;
        }
        if let Some(child) = processes.get(child_pid) {
            children.push(build_node(child, processes, children_of, keys, visited));
        }
    }

    ProcessNode {
        pid: process.pid,
        attributes,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::record::CycleContext;
    use pmon_shared::ProcessSnapshot;
    use serde_json::json;
    use std::num::NonZeroUsize;

    fn table(master_pid: Option<u32>, snapshots: Vec<Value>) -> BTreeMap<u32, ProcessRecord> {
        let ctx = CycleContext {
            index: 0,
            master_pid,
            history_capacity: NonZeroUsize::MIN,
            process_history_keys: &[],
            file_history_keys: &[],
        };
        snapshots
            .into_iter()
            .map(|value| {
                let snapshot: ProcessSnapshot = serde_json::from_value(value).unwrap();
                let record = ProcessRecord::from_snapshot(snapshot, &ctx).unwrap();
                (record.pid, record)
            })
            .collect()
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn test_project_master_with_two_children() {
        let processes = table(
            Some(1),
            vec![
                json!({ "pid": 3, "parent_pid": 1, "cpu_percent": 0.5 }),
                json!({ "pid": 1, "cpu_percent": 2.0, "memory_rss": 1024 }),
                json!({ "pid": 2, "parent_pid": 1, "cpu_percent": 1.0 }),
            ],
        );

        let tree = project(&processes, &keys(&["cpu_percent", "memory_rss", "is_master"])).unwrap();

        assert_eq!(tree.size(), 3);
        insta::assert_json_snapshot!(tree, @r###"
        {
          "pid": 1,
          "cpu_percent": 2.0,
          "is_master": true,
          "memory_rss": 1024,
          "children": [
            {
              "pid": 2,
              "cpu_percent": 1.0,
              "is_master": false
            },
            {
              "pid": 3,
              "cpu_percent": 0.5,
              "is_master": false
            }
          ]
        }
        "###);
    }

    #[test]
    fn test_no_master_means_no_tree() {
        let processes = table(None, vec![json!({ "pid": 1 }), json!({ "pid": 2, "parent_pid": 1 })]);
        assert_eq!(project(&processes, &keys(&["cpu_percent"])), None);
    }

    #[test]
    fn test_unrelated_processes_are_not_projected() {
        let processes = table(
            Some(1),
            vec![
                json!({ "pid": 1 }),
                json!({ "pid": 2, "parent_pid": 1 }),
                json!({ "pid": 50, "parent_pid": 49 }),
            ],
        );

        let tree = project(&processes, &[]).unwrap();
        assert_eq!(tree.size(), 2);
        assert_eq!(tree.children[0].pid, 2);
        assert!(tree.children[0].attributes.is_empty());
    }

    #[test]
    fn test_parent_cycle_is_projected_once() {
        let processes = table(
            Some(1),
            vec![
                json!({ "pid": 1, "parent_pid": 2 }),
                json!({ "pid": 2, "parent_pid": 1 }),
            ],
        );

        let tree = project(&processes, &[]).unwrap();
        assert_eq!(tree.size(), 2);
        assert!(tree.children[0].children.is_empty());
    }
}
