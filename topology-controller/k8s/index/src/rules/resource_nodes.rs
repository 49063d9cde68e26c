use super::{node, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{GraphBuilder, Kind};
use cluster_topology_k8s_api::Resource;

/// Adds one node for every tracked resource.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceNodes;

impl Rule for ResourceNodes {
    fn name(&self) -> &'static str {
        "resource-nodes"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        for r in s.deployments() {
            graph.add_node(node(Kind::Deployment, r.meta())?);
        }
        for r in s.services() {
            graph.add_node(node(Kind::Service, r.meta())?);
        }
        for r in s.stateful_sets() {
            graph.add_node(node(Kind::StatefulSet, r.meta())?);
        }
        for r in s.ingresses() {
            graph.add_node(node(Kind::Ingress, r.meta())?);
        }
        for r in s.config_maps() {
            graph.add_node(node(Kind::ConfigMap, r.meta())?);
        }
        for r in s.secrets() {
            graph.add_node(node(Kind::Secret, r.meta())?);
        }
        for r in s.persistent_volume_claims() {
            graph.add_node(node(Kind::PersistentVolumeClaim, r.meta())?);
        }
        Ok(())
    }
}
