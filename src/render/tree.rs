use console::style;

use super::format::format_attribute;
use crate::monitor::ProcessNode;

/// Render the process tree with box-drawing guides, one process per line
pub fn render_tree(tree: &ProcessNode) -> String {
    let mut lines = Vec::new();
    lines.push(node_line(tree));
    render_children(tree, "", &mut lines);
    lines.join("\n")
}

fn render_children(node: &ProcessNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (position, child) in node.children.iter().enumerate() {
        let last = position + 1 == count;
        let (branch, guide) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!("{prefix}{branch}{}", node_line(child)));
        render_children(child, &format!("{prefix}{guide}"), lines);
    }
}

fn node_line(node: &ProcessNode) -> String {
    let mut parts = vec![style(node.pid).bold().to_string()];
    parts.extend(
        node.attributes
            .iter()
            .filter_map(|(key, value)| format_attribute(key, value)),
    );
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    fn node(pid: u32, attributes: Value, children: Vec<ProcessNode>) -> ProcessNode {
        let attributes: BTreeMap<String, Value> = serde_json::from_value(attributes).unwrap();
        ProcessNode {
            pid,
            attributes,
            children,
        }
    }

    #[test]
    fn test_render_tree() {
        console::set_colors_enabled(false);

        let tree = node(
            1,
            json!({ "is_master": true, "is_running": true, "cpu_percent": 2.5, "memory_rss": 2048 }),
            vec![
                node(
                    2,
                    json!({ "is_master": false, "is_running": true, "cpu_percent": 0.4 }),
                    vec![node(4, json!({ "is_running": false }), vec![])],
                ),
                node(3, json!({ "is_running": true, "threads": null }), vec![]),
            ],
        );

        insta::assert_snapshot!(render_tree(&tree), @r###"
        1 cpu_percent=2.5% master running memory_rss=2 KB
        ├── 2 cpu_percent=0.4% running
        │   └── 4 stopped
        └── 3 running
        "###);
    }
}
