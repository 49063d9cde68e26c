use super::{node_id, scope, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{Edge, GraphBuilder, Kind, NodeId};
use cluster_topology_k8s_api::{PodTemplate, Resource};

/// Links stateful sets to the claims mounted by their pod template volumes.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkloadClaims;

impl Rule for WorkloadClaims {
    fn name(&self) -> &'static str {
        "workload-claims"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        for sts in s.stateful_sets() {
            let sts_id = node_id(Kind::StatefulSet, sts.meta())?;
            let (ns, _) = scope(Kind::StatefulSet, sts.meta())?;

            let volumes = sts.pod_spec().into_iter().flat_map(|spec| spec.volumes.iter().flatten());
            for claim in volumes.filter_map(|v| v.persistent_volume_claim.as_ref()) {
                graph.add_edge(Edge::new(
                    sts_id.clone(),
                    NodeId::new(Kind::PersistentVolumeClaim, ns, &claim.claim_name),
                ));
            }
        }
        Ok(())
    }
}
