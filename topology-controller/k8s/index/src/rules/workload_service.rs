use super::{node_id, scope, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{Edge, GraphBuilder, Kind, NodeId};
use cluster_topology_k8s_api::{Resource, Selector};

/// Links workloads to the services that select their pods.
///
/// A service selects a workload when its selector is non-empty and is a subset of the workload's
/// pod template labels. Only services in the workload's namespace are considered.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkloadServices;

impl Rule for WorkloadServices {
    fn name(&self) -> &'static str {
        "workload-services"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        for workload in s.workloads() {
            let (ns, name) = scope(workload.kind(), workload.meta())?;
            let labels = workload.template_labels();

            for svc in s.services() {
                let (svc_ns, _) = scope(Kind::Service, svc.meta())?;
                if svc_ns != ns {
                    continue;
                }

                let selector = Selector::from(svc.spec.as_ref().and_then(|s| s.selector.as_ref()));
                if selector.matches(&labels) {
                    graph.add_edge(Edge::new(
                        NodeId::new(workload.kind(), ns, name),
                        node_id(Kind::Service, svc.meta())?,
                    ));
                }
            }
        }
        Ok(())
    }
}
