//! Formatted output helpers for CLI commands.

use std::fmt::Write;

use podtap_deploy::cluster::NodeRecord;

/// Formats nodes as a `NAME INTERNAL-IP` table, one line per node.
///
/// Nodes without an internal IP show `-`.
#[must_use]
pub fn format_node_table(nodes: &[NodeRecord]) -> String {
    let width = nodes
        .iter()
        .map(|n| n.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  INTERNAL-IP\n", "NAME");
    for node in nodes {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            node.name,
            node.internal_ip().unwrap_or("-")
        );
    }
    out
}
