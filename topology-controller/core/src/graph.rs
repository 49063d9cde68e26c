//! The topology graph model.
//!
//! A [`Graph`] is an unordered set of [`Node`]s and directed [`Edge`]s. Graphs are accumulated with
//! a [`GraphBuilder`], which collapses repeated insertions:
//!
//! - nodes are keyed by their derived [`NodeId`] and the first insertion wins;
//! - edges are keyed by their `(source, target)` pair and the last insertion wins.
//!
//! The order of `nodes` and `edges` in a built graph is unspecified and may differ between builds
//! of the same input.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form attributes attached to a node or edge.
pub type Data = serde_json::Map<String, serde_json::Value>;

/// The resource kinds that may appear in a topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Deployment,
    StatefulSet,
    Service,
    Ingress,
    ConfigMap,
    Secret,
    #[serde(rename = "PVC")]
    PersistentVolumeClaim,
}

/// Identifies a node as `<kind>:<namespace>/<name>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: Kind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Accumulates nodes and edges for a single graph.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<(NodeId, NodeId), Edge>,
}

// === impl Kind ===

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::Deployment,
        Kind::StatefulSet,
        Kind::Service,
        Kind::Ingress,
        Kind::ConfigMap,
        Kind::Secret,
        Kind::PersistentVolumeClaim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Deployment => "Deployment",
            Kind::StatefulSet => "StatefulSet",
            Kind::Service => "Service",
            Kind::Ingress => "Ingress",
            Kind::ConfigMap => "ConfigMap",
            Kind::Secret => "Secret",
            Kind::PersistentVolumeClaim => "PVC",
        }
    }

    /// The lower-cased kind used as a node identifier prefix.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Kind::Deployment => "deployment",
            Kind::StatefulSet => "statefulset",
            Kind::Service => "service",
            Kind::Ingress => "ingress",
            Kind::ConfigMap => "configmap",
            Kind::Secret => "secret",
            Kind::PersistentVolumeClaim => "pvc",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl NodeId ===

impl NodeId {
    pub fn new(kind: Kind, namespace: &str, name: &str) -> Self {
        Self(format!("{}:{}/{}", kind.id_prefix(), namespace, name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    #[inline]
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

// === impl Node ===

impl Node {
    pub fn new(kind: Kind, namespace: &str, name: &str) -> Self {
        Self {
            id: NodeId::new(kind, namespace, name),
            kind,
            name: name.to_string(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }
}

// === impl Edge ===

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }
}

// === impl Graph ===

impl Graph {
    /// Orders nodes by id and edges by `(source, target)` so that graphs may be compared without
    /// regard to emission order.
    pub fn sorted(mut self) -> Self {
        self.nodes.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges
            .sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn has_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == *source && e.target == *target)
    }
}

// === impl GraphBuilder ===

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node unless one with the same id already exists.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.entry(node.id.clone()).or_insert(node);
    }

    /// Inserts an edge, replacing any prior edge with the same source and target.
    ///
    /// Neither endpoint needs to exist as a node.
    pub fn add_edge(&mut self, edge: Edge) {
        let key = (edge.source.clone(), edge.target.clone());
        self.edges.insert(key, edge);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn build(self) -> Graph {
        Graph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> Data {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("data must be an object"),
        }
    }

    #[test]
    fn node_ids() {
        assert_eq!(
            NodeId::new(Kind::Deployment, "default", "api").as_str(),
            "deployment:default/api"
        );
        assert_eq!(
            NodeId::new(Kind::PersistentVolumeClaim, "db", "data-0").as_str(),
            "pvc:db/data-0"
        );
        assert_eq!(
            NodeId::new(Kind::StatefulSet, "db", "pg").as_str(),
            "statefulset:db/pg"
        );
    }

    #[test]
    fn first_node_wins() {
        let mut b = GraphBuilder::new();
        b.add_node(Node::new(Kind::Service, "ns", "web").with_data(data(json!({"n": 1}))));
        b.add_node(Node::new(Kind::Service, "ns", "web").with_data(data(json!({"n": 2}))));
        b.add_node(Node::new(Kind::Service, "ns", "web"));

        let graph = b.build();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].data, Some(data(json!({"n": 1}))));
    }

    #[test]
    fn last_edge_wins() {
        let src = NodeId::new(Kind::Deployment, "ns", "api");
        let dst = NodeId::new(Kind::Service, "ns", "api");

        let mut b = GraphBuilder::new();
        b.add_edge(Edge::new(src.clone(), dst.clone()).with_data(data(json!({"via": "a"}))));
        b.add_edge(Edge::new(src.clone(), dst.clone()).with_data(data(json!({"via": "b"}))));

        let graph = b.build();
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].data, Some(data(json!({"via": "b"}))));
    }

    #[test]
    fn edges_are_directed() {
        let a = NodeId::new(Kind::Deployment, "ns", "a");
        let b = NodeId::new(Kind::Service, "ns", "b");

        let mut builder = GraphBuilder::new();
        builder.add_edge(Edge::new(a.clone(), b.clone()));
        builder.add_edge(Edge::new(b.clone(), a.clone()));
        assert_eq!(builder.edge_count(), 2);

        let graph = builder.build();
        assert!(graph.has_edge(&a, &b));
        assert!(graph.has_edge(&b, &a));
    }

    #[test]
    fn dangling_edges_are_kept() {
        let mut b = GraphBuilder::new();
        b.add_edge(Edge::new(
            NodeId::new(Kind::Ingress, "ns", "www"),
            NodeId::new(Kind::Service, "ns", "missing"),
        ));
        let graph = b.build();
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn wire_format() {
        let mut b = GraphBuilder::new();
        b.add_node(Node::new(Kind::PersistentVolumeClaim, "db", "data"));
        b.add_edge(Edge::new(
            NodeId::new(Kind::StatefulSet, "db", "pg"),
            NodeId::new(Kind::PersistentVolumeClaim, "db", "data"),
        ));

        let value = serde_json::to_value(b.build()).expect("graph must serialize");
        assert_eq!(
            value,
            json!({
                "nodes": [{"id": "pvc:db/data", "kind": "PVC", "name": "data"}],
                "edges": [{"source": "statefulset:db/pg", "target": "pvc:db/data"}],
            })
        );

        let graph: Graph = serde_json::from_value(value).expect("graph must deserialize");
        assert_eq!(graph.nodes[0].kind, Kind::PersistentVolumeClaim);
        assert_eq!(graph.nodes[0].data, None);
    }

    #[test]
    fn sorted_ignores_emission_order() {
        let a = Graph {
            nodes: vec![
                Node::new(Kind::Service, "ns", "b"),
                Node::new(Kind::Deployment, "ns", "a"),
            ],
            edges: vec![],
        };
        let b = Graph {
            nodes: vec![
                Node::new(Kind::Deployment, "ns", "a"),
                Node::new(Kind::Service, "ns", "b"),
            ],
            edges: vec![],
        };
        assert_ne!(a, b);
        assert_eq!(a.sorted(), b.sorted());
    }
}
