use super::{node_id, scope, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{Edge, GraphBuilder, Kind, NodeId};
use cluster_topology_k8s_api::Resource;

/// Values shorter than this are never matched against service names.
const MIN_VALUE_LEN: usize = 3;

/// Links workloads to services whose names appear in their containers' environment.
///
/// A workload is linked to a service when the trimmed value of any literal environment variable
/// contains the service's name as a substring. This catches hostnames and connection strings that
/// address a service by name, and it also links services with short names that happen to appear
/// in unrelated values. Services in every namespace of the snapshot are candidates.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServiceDiscovery;

impl Rule for ServiceDiscovery {
    fn name(&self) -> &'static str {
        "service-discovery"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        let mut services = Vec::<(&str, NodeId)>::with_capacity(s.services().len());
        for svc in s.services() {
            let (_, name) = scope(Kind::Service, svc.meta())?;
            services.push((name, node_id(Kind::Service, svc.meta())?));
        }

        for workload in s.workloads() {
            let workload_id = node_id(workload.kind(), workload.meta())?;

            let containers = workload.pod_spec().into_iter().flat_map(|spec| spec.containers.iter());
            let values = containers
                .flat_map(|c| c.env.iter().flatten())
                .filter_map(|env| env.value.as_deref())
                .map(str::trim)
                .filter(|v| v.len() >= MIN_VALUE_LEN);

            for value in values {
                for (name, svc_id) in services.iter() {
                    if value.contains(*name) {
                        graph.add_edge(Edge::new(workload_id.clone(), svc_id.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::{apply, id, resource};
    use cluster_topology_k8s_api as k8s;
    use serde_json::json;

    fn deployment(ns: &str, name: &str, env: serde_json::Value) -> k8s::Deployment {
        resource(json!({
            "metadata": {"namespace": ns, "name": name},
            "spec": {
                "selector": {},
                "template": {"spec": {"containers": [{"name": "main", "env": env}]}},
            },
        }))
    }

    fn service(ns: &str, name: &str) -> k8s::Service {
        resource(json!({"metadata": {"namespace": ns, "name": name}}))
    }

    #[test]
    fn links_services_named_in_env_values() {
        let snapshot = Snapshot::builder("")
            .deployment(deployment(
                "app",
                "api",
                json!([
                    {"name": "DATABASE_URL", "value": "postgres://pg.db.svc:5432/app"},
                    {"name": "CACHE_HOST", "value": "  redis  "},
                ]),
            ))
            .service(service("db", "pg"))
            .service(service("cache", "redis"))
            .service(service("app", "billing"))
            .build();

        let graph = apply(&ServiceDiscovery, &snapshot);
        let api = id(Kind::Deployment, "app", "api");
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.has_edge(&api, &id(Kind::Service, "db", "pg")));
        assert!(graph.has_edge(&api, &id(Kind::Service, "cache", "redis")));
    }

    #[test]
    fn short_values_are_ignored() {
        let snapshot = Snapshot::builder("ns")
            .deployment(deployment(
                "ns",
                "api",
                json!([{"name": "MODE", "value": " db "}]),
            ))
            .service(service("ns", "db"))
            .build();

        assert!(apply(&ServiceDiscovery, &snapshot).edges.is_empty());
    }

    #[test]
    fn substring_matches_are_kept() {
        // "api" appears within the unrelated value "rapid".
        let snapshot = Snapshot::builder("ns")
            .deployment(deployment(
                "ns",
                "worker",
                json!([{"name": "QUEUE_MODE", "value": "rapid"}]),
            ))
            .service(service("ns", "api"))
            .build();

        let graph = apply(&ServiceDiscovery, &snapshot);
        assert!(graph.has_edge(
            &id(Kind::Deployment, "ns", "worker"),
            &id(Kind::Service, "ns", "api")
        ));
    }

    #[test]
    fn value_from_references_are_ignored() {
        let snapshot = Snapshot::builder("ns")
            .deployment(deployment(
                "ns",
                "api",
                json!([{
                    "name": "PASSWORD",
                    "valueFrom": {"secretKeyRef": {"name": "postgres", "key": "password"}},
                }]),
            ))
            .service(service("ns", "postgres"))
            .build();

        assert!(apply(&ServiceDiscovery, &snapshot).edges.is_empty());
    }

    #[test]
    fn stateful_set_env_values() {
        let snapshot = Snapshot::builder("ns")
            .stateful_set(resource::<k8s::StatefulSet>(json!({
                "metadata": {"namespace": "ns", "name": "indexer"},
                "spec": {
                    "selector": {},
                    "serviceName": "indexer",
                    "template": {"spec": {"containers": [{
                        "name": "main",
                        "env": [{"name": "SEARCH", "value": "http://search:9200"}],
                    }]}},
                },
            })))
            .service(service("ns", "search"))
            .build();

        let graph = apply(&ServiceDiscovery, &snapshot);
        assert!(graph.has_edge(
            &id(Kind::StatefulSet, "ns", "indexer"),
            &id(Kind::Service, "ns", "search")
        ));
    }
}
