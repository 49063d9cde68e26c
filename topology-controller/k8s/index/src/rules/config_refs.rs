use super::{node_id, scope, Rule, RuleError};
use crate::Snapshot;
use cluster_topology_core::{Edge, GraphBuilder, Kind};
use cluster_topology_k8s_api::{ObjectMeta, PodSpec, PodTemplate, Resource};

/// Links deployments to the config maps their pods reference.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeploymentConfigMaps;

/// Links deployments to the secrets their pods reference.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeploymentSecrets;

impl Rule for DeploymentConfigMaps {
    fn name(&self) -> &'static str {
        "deployment-configmaps"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        let config_maps = s.config_maps().iter().map(|cm| cm.meta());
        link_deployments(s, Kind::ConfigMap, config_maps, graph)
    }
}

impl Rule for DeploymentSecrets {
    fn name(&self) -> &'static str {
        "deployment-secrets"
    }

    fn apply(&self, s: &Snapshot, graph: &mut GraphBuilder) -> Result<(), RuleError> {
        let secrets = s.secrets().iter().map(|sec| sec.meta());
        link_deployments(s, Kind::Secret, secrets, graph)
    }
}

fn link_deployments<'s>(
    s: &'s Snapshot,
    kind: Kind,
    targets: impl Iterator<Item = &'s ObjectMeta> + Clone,
    graph: &mut GraphBuilder,
) -> Result<(), RuleError> {
    for deploy in s.deployments() {
        let (ns, _) = scope(Kind::Deployment, deploy.meta())?;
        let deploy_id = node_id(Kind::Deployment, deploy.meta())?;
        let Some(spec) = deploy.pod_spec() else {
            continue;
        };

        for meta in targets.clone() {
            let (target_ns, target_name) = scope(kind, meta)?;
            if target_ns != ns {
                continue;
            }

            if is_referenced(spec, kind, target_name) {
                graph.add_edge(Edge::new(deploy_id.clone(), node_id(kind, meta)?));
            }
        }
    }
    Ok(())
}

/// Returns true if the pod spec references the named config map or secret through a volume, an
/// `envFrom` source, or an environment variable key reference on any container.
fn is_referenced(spec: &PodSpec, kind: Kind, name: &str) -> bool {
    let volume = spec.volumes.iter().flatten().any(|v| match kind {
        Kind::ConfigMap => v.config_map.as_ref().is_some_and(|cm| cm.name == name),
        Kind::Secret => v
            .secret
            .as_ref()
            .is_some_and(|sec| sec.secret_name.as_deref() == Some(name)),
        _ => false,
    });
    if volume {
        return true;
    }

    let mut containers = spec.init_containers.iter().flatten().chain(spec.containers.iter());
    containers.any(|c| {
        let env_from = c.env_from.iter().flatten().any(|src| match kind {
            Kind::ConfigMap => src.config_map_ref.as_ref().is_some_and(|r| r.name == name),
            Kind::Secret => src.secret_ref.as_ref().is_some_and(|r| r.name == name),
            _ => false,
        });

        let env = c
            .env
            .iter()
            .flatten()
            .filter_map(|e| e.value_from.as_ref())
            .any(|src| match kind {
                Kind::ConfigMap => src.config_map_key_ref.as_ref().is_some_and(|r| r.name == name),
                Kind::Secret => src.secret_key_ref.as_ref().is_some_and(|r| r.name == name),
                _ => false,
            });

        env_from || env
    })
}
