use super::{node_id, scope, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{Edge, GraphBuilder, Kind, NodeId};
use cluster_topology_k8s_api::Resource;

/// Links ingresses to the services referenced by their HTTP path backends.
///
/// Backends are resolved in the ingress's namespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct IngressServices;

impl Rule for IngressServices {
    fn name(&self) -> &'static str {
        "ingress-services"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        for ing in s.ingresses() {
            let ing_id = node_id(Kind::Ingress, ing.meta())?;
            let (ns, _) = scope(Kind::Ingress, ing.meta())?;

            let rules = ing.spec.iter().flat_map(|spec| spec.rules.iter().flatten());
            let paths = rules.flat_map(|rule| rule.http.iter().flat_map(|http| http.paths.iter()));
            for backend in paths.filter_map(|path| path.backend.service.as_ref()) {
                graph.add_edge(Edge::new(
                    ing_id.clone(),
                    NodeId::new(Kind::Service, ns, &backend.name),
                ));
            }
        }
        Ok(())
    }
}
