//! Resource dependency graph.
//!
//! Built in two passes. [`GraphBuilder`] records resources and references by
//! name while the dump is walked; [`GraphBuilder::finish`] then resolves every
//! edge endpoint to the synthetic id assigned to that resource.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

/// Resource kinds along the dependency chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Listener,
    Route,
    Cluster,
    Endpoint,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] =
        [NodeKind::Listener, NodeKind::Route, NodeKind::Cluster, NodeKind::Endpoint];

    /// Prefix of synthetic ids
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeKind::Listener => "LDS",
            NodeKind::Route => "RDS",
            NodeKind::Cluster => "CDS",
            NodeKind::Endpoint => "EDS",
        }
    }

    /// Fill and border color of the kind
    pub fn color(&self) -> &'static str {
        match self {
            NodeKind::Listener => "#4285F4",
            NodeKind::Route => "#EA4335",
            NodeKind::Cluster => "#FBBC04",
            NodeKind::Endpoint => "#34A853",
        }
    }

    /// Kind that this kind references, if any
    pub fn target(&self) -> Option<NodeKind> {
        match self {
            NodeKind::Listener => Some(NodeKind::Route),
            NodeKind::Route => Some(NodeKind::Cluster),
            NodeKind::Cluster => Some(NodeKind::Endpoint),
            NodeKind::Endpoint => None,
        }
    }
}

/// One declared resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GraphNode {
    pub name: String,
    pub id: String,
    pub kind: NodeKind,
}

/// Endpoint of an edge after id resolution. Ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeEnd {
    /// Declared resource
    Node { name: String, id: String },
    /// Referenced but never declared in the dump
    Dangling { name: String },
}

impl EdgeEnd {
    pub fn name(&self) -> &str {
        match self {
            EdgeEnd::Node { name, .. } | EdgeEnd::Dangling { name } => name,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            EdgeEnd::Node { id, .. } => Some(id),
            EdgeEnd::Dangling { .. } => None,
        }
    }
}

impl Ord for EdgeEnd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name().cmp(other.name()).then_with(|| self.id().cmp(&other.id()))
    }
}

impl PartialOrd for EdgeEnd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Edges from one kind to the next, keyed and ordered by source name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeLevel {
    pub edges: BTreeMap<String, (EdgeEnd, BTreeSet<EdgeEnd>)>,
}

impl EdgeLevel {
    /// `(source, target)` pairs, sources by name then targets by name
    pub fn pairs(&self) -> impl Iterator<Item = (&EdgeEnd, &EdgeEnd)> {
        self.edges
            .values()
            .flat_map(|(source, targets)| targets.iter().map(move |target| (source, target)))
    }

    pub fn len(&self) -> usize {
        self.edges.values().map(|(_, targets)| targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Finished graph handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphModel {
    /// Per kind, name to id
    pub nodes: BTreeMap<NodeKind, BTreeMap<String, String>>,
    /// Listener→Route, Route→Cluster, Cluster→Endpoint
    pub levels: Vec<(NodeKind, EdgeLevel)>,
}

impl GraphModel {
    /// All declared nodes ordered by name
    pub fn nodes_by_name(&self) -> Vec<GraphNode> {
        let mut nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .flat_map(|(kind, names)| {
                names.iter().map(move |(name, id)| GraphNode {
                    name: name.clone(),
                    id: id.clone(),
                    kind: *kind,
                })
            })
            .collect();
        nodes.sort();
        nodes
    }

    pub fn id_of(&self, kind: NodeKind, name: &str) -> Option<&str> {
        self.nodes.get(&kind).and_then(|names| names.get(name)).map(String::as_str)
    }

    /// Edges of the level starting at `kind`
    pub fn level(&self, kind: NodeKind) -> Option<&EdgeLevel> {
        self.levels.iter().find(|(source, _)| *source == kind).map(|(_, level)| level)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.levels.iter().map(|(_, level)| level.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0 && self.edge_count() == 0
    }
}

/// Id assignment for one kind: first-seen order, one id per name
#[derive(Debug, Default)]
struct KindIds {
    ids: HashMap<String, String>,
    next: usize,
}

impl KindIds {
    fn assign(&mut self, prefix: &str, name: &str) -> String {
        if let Some(id) = self.ids.get(name) {
            return id.clone();
        }
        let id = format!("{}{}", prefix, self.next);
        self.next += 1;
        self.ids.insert(name.to_string(), id.clone());
        id
    }
}

/// Name-level accumulator filled during extraction
#[derive(Debug, Default)]
pub struct GraphBuilder {
    ids: HashMap<NodeKind, KindIds>,
    /// Endpoint groups have no name of their own; keyed by owning cluster
    endpoint_groups: HashMap<String, String>,
    edges: HashMap<NodeKind, BTreeMap<String, BTreeSet<String>>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named resource and return its id
    pub fn declare(&mut self, kind: NodeKind, name: &str) -> String {
        self.ids.entry(kind).or_default().assign(kind.prefix(), name)
    }

    /// Declare the endpoint group of `cluster_name`; its name is its id.
    /// Records the Cluster→Endpoint reference.
    pub fn declare_endpoints(&mut self, cluster_name: &str) -> String {
        if let Some(id) = self.endpoint_groups.get(cluster_name) {
            return id.clone();
        }
        let ids = self.ids.entry(NodeKind::Endpoint).or_default();
        let id = format!("{}{}", NodeKind::Endpoint.prefix(), ids.next);
        let id = ids.assign(NodeKind::Endpoint.prefix(), &id);
        self.endpoint_groups.insert(cluster_name.to_string(), id.clone());
        self.reference(NodeKind::Cluster, cluster_name, &id);
        id
    }

    /// Record that `source` (of kind `kind`) references `target` of the next kind
    pub fn reference(&mut self, kind: NodeKind, source: &str, target: &str) {
        self.edges
            .entry(kind)
            .or_default()
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    /// Resolve names to ids
    pub fn finish(self) -> GraphModel {
        let nodes: BTreeMap<NodeKind, BTreeMap<String, String>> = NodeKind::ALL
            .iter()
            .map(|kind| {
                let names = self
                    .ids
                    .get(kind)
                    .map(|ids| ids.ids.iter().map(|(n, i)| (n.clone(), i.clone())).collect())
                    .unwrap_or_default();
                (*kind, names)
            })
            .collect();

        let resolve = |kind: NodeKind, name: &str| -> EdgeEnd {
            match nodes.get(&kind).and_then(|names| names.get(name)) {
                Some(id) => EdgeEnd::Node { name: name.to_string(), id: id.clone() },
                None => {
                    debug!(kind = kind.prefix(), name = %name, "Reference to undeclared resource");
                    EdgeEnd::Dangling { name: name.to_string() }
                }
            }
        };

        let mut levels = Vec::new();
        for kind in [NodeKind::Listener, NodeKind::Route, NodeKind::Cluster] {
            let Some(target_kind) = kind.target() else { continue };
            let mut level = EdgeLevel::default();
            if let Some(edges) = self.edges.get(&kind) {
                for (source, targets) in edges {
                    if targets.is_empty() {
                        continue;
                    }
                    let resolved: BTreeSet<EdgeEnd> =
                        targets.iter().map(|t| resolve(target_kind, t)).collect();
                    level.edges.insert(source.clone(), (resolve(kind, source), resolved));
                }
            }
            levels.push((kind, level));
        }

        GraphModel { nodes, levels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_in_first_seen_order() {
        let mut builder = GraphBuilder::new();
        assert_eq!(builder.declare(NodeKind::Listener, "b"), "LDS0");
        assert_eq!(builder.declare(NodeKind::Listener, "a"), "LDS1");
        assert_eq!(builder.declare(NodeKind::Route, "a"), "RDS0");
        assert_eq!(builder.declare(NodeKind::Listener, "b"), "LDS0");
    }

    #[test]
    fn test_endpoint_groups_named_by_id() {
        let mut builder = GraphBuilder::new();
        builder.declare(NodeKind::Cluster, "c0");
        assert_eq!(builder.declare_endpoints("c0"), "EDS0");
        assert_eq!(builder.declare_endpoints("c1"), "EDS1");
        assert_eq!(builder.declare_endpoints("c0"), "EDS0");

        let model = builder.finish();
        assert_eq!(model.id_of(NodeKind::Endpoint, "EDS1"), Some("EDS1"));
        let cluster_edges = model.level(NodeKind::Cluster).unwrap();
        assert_eq!(cluster_edges.len(), 2);
    }

    #[test]
    fn test_finish_resolves_ids_and_keeps_dangling() {
        let mut builder = GraphBuilder::new();
        builder.reference(NodeKind::Listener, "l0", "r0");
        builder.reference(NodeKind::Listener, "l0", "r-missing");
        builder.declare(NodeKind::Listener, "l0");
        builder.declare(NodeKind::Route, "r0");

        let model = builder.finish();
        let pairs: Vec<(String, Option<String>)> = model
            .level(NodeKind::Listener)
            .unwrap()
            .pairs()
            .map(|(_, target)| (target.name().to_string(), target.id().map(str::to_string)))
            .collect();
        assert_eq!(
            pairs,
            vec![("r-missing".to_string(), None), ("r0".to_string(), Some("RDS0".to_string()))]
        );
    }

    #[test]
    fn test_empty_model() {
        let model = GraphBuilder::new().finish();
        assert!(model.is_empty());
        assert_eq!(model.levels.len(), 3);
    }
}
