//! Topology rules.
//!
//! Each rule inspects a [`Snapshot`] and contributes nodes and edges to a [`GraphBuilder`]. Rules
//! hold no state, so applying a rule twice to the same snapshot yields the same contribution.
//!
//! Rules run in registration order against a single builder. The [`ResourceNodes`] rule is
//! registered first so that relationship rules run after every tracked resource has a node,
//! although edges never require their endpoints to exist.

use crate::Snapshot;
use cluster_topology_core::{Graph, GraphBuilder, Kind, Node, NodeId};
use cluster_topology_k8s_api::ObjectMeta;
use tracing::{debug, instrument, trace};

mod config_refs;
mod ingress_service;
mod resource_nodes;
mod service_discovery;
mod workload_claim;
mod workload_service;

pub use self::{
    config_refs::{DeploymentConfigMaps, DeploymentSecrets},
    ingress_service::IngressServices,
    resource_nodes::ResourceNodes,
    service_discovery::ServiceDiscovery,
    workload_claim::WorkloadClaims,
    workload_service::WorkloadServices,
};

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, snapshot: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: Kind, field: &'static str },
}

#[derive(Debug, thiserror::Error)]
#[error("rule {rule} failed: {source}")]
pub struct RuleFailure {
    pub rule: &'static str,
    #[source]
    pub source: RuleError,
}

/// An ordered list of rules.
pub struct Rules(Vec<Box<dyn Rule>>);

// === impl Rules ===

impl Rules {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self(rules)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|r| r.name())
    }

    /// Applies every rule in order to a fresh builder.
    ///
    /// The first rule to fail aborts the build; no partial graph is returned.
    #[instrument(skip_all, fields(ns = %snapshot.namespace()))]
    pub fn build(&self, snapshot: &Snapshot) -> Result<Graph, RuleFailure> {
        let mut graph = GraphBuilder::new();
        for rule in self.0.iter() {
            rule.apply(snapshot, &mut graph)
                .map_err(|source| RuleFailure {
                    rule: rule.name(),
                    source,
                })?;
            trace!(
                rule = rule.name(),
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "Applied"
            );
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built topology"
        );
        Ok(graph.build())
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ResourceNodes),
            // Network
            Box::new(WorkloadServices),
            Box::new(IngressServices),
            Box::new(ServiceDiscovery),
            // Storage and configuration
            Box::new(WorkloadClaims),
            Box::new(DeploymentConfigMaps),
            Box::new(DeploymentSecrets),
        ])
    }
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// === helpers ===

/// Returns a resource's namespace and name.
fn scope(kind: Kind, meta: &ObjectMeta) -> Result<(&str, &str), RuleError> {
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or(RuleError::MissingMetadata {
            kind,
            field: "namespace",
        })?;
    let name = meta.name.as_deref().ok_or(RuleError::MissingMetadata {
        kind,
        field: "name",
    })?;
    Ok((namespace, name))
}

fn node_id(kind: Kind, meta: &ObjectMeta) -> Result<NodeId, RuleError> {
    let (ns, name) = scope(kind, meta)?;
    Ok(NodeId::new(kind, ns, name))
}

fn node(kind: Kind, meta: &ObjectMeta) -> Result<Node, RuleError> {
    let (ns, name) = scope(kind, meta)?;
    Ok(Node::new(kind, ns, name))
}
