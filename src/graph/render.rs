//! Graphviz DOT rendering of a [`GraphModel`].
//!
//! Output is a pure function of the model: edges level by level (sources and
//! targets sorted by name), then node declarations sorted by name.
//!
//! Declared resources are keyed by their synthetic id, which is unique across
//! kinds, and carry their resource name as a tooltip. A reference to a
//! resource missing from the dump is keyed `<PREFIX>:<name>` of the kind it
//! should have had and gets no declaration.

use std::fmt::Write as _;

use crate::graph::model::{EdgeEnd, GraphModel, NodeKind};

const EDGE_ATTRS: &str = "[ arrowsize=0.3, penwidth=0.3 ]";

fn quote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Graph node id of an edge end of kind `kind`
fn node_key(end: &EdgeEnd, kind: NodeKind) -> String {
    match end.id() {
        Some(id) => quote(id),
        None => quote(&format!("{}:{}", kind.prefix(), end.name())),
    }
}

/// Render the model as a `digraph`. An empty model renders an empty graph.
pub fn render(model: &GraphModel) -> String {
    let mut dot = String::from("digraph G {\nrankdir=LR;\n");

    for (kind, level) in &model.levels {
        let Some(target_kind) = kind.target() else { continue };
        for (source, target) in level.pairs() {
            let _ = writeln!(
                dot,
                "{}->{}{};",
                node_key(source, *kind),
                node_key(target, target_kind),
                EDGE_ATTRS
            );
        }
    }

    for node in model.nodes_by_name() {
        let color = node.kind.color();
        let _ = writeln!(
            dot,
            "{} [ color=\"{color}\", fillcolor=\"{color}\", fontcolor=white, fontname=Roboto, label={}, shape=box, style=\"filled,rounded\", tooltip={} ];",
            quote(&node.id),
            node.id,
            quote(&node.name),
        );
    }

    dot.push_str("\n}\n");
    dot
}
