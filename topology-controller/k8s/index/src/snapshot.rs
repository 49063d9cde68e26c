use cluster_topology_core::Kind;
use cluster_topology_k8s_api::{
    self as k8s, ConfigMap, Deployment, Ingress, ObjectMeta, PersistentVolumeClaim, PodTemplate,
    Secret, Service, StatefulSet,
};
use std::sync::Arc;

/// A read-only view of the tracked resources within a namespace scope.
///
/// Each kind is read from an independently synchronized cache, so two kinds may reflect different
/// points in time.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    namespace: String,
    deployments: Vec<Arc<Deployment>>,
    stateful_sets: Vec<Arc<StatefulSet>>,
    services: Vec<Arc<Service>>,
    ingresses: Vec<Arc<Ingress>>,
    config_maps: Vec<Arc<ConfigMap>>,
    secrets: Vec<Arc<Secret>>,
    claims: Vec<Arc<PersistentVolumeClaim>>,
}

/// Assembles a [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder(Snapshot);

/// A resource that manages pods.
#[derive(Copy, Clone, Debug)]
pub enum Workload<'s> {
    Deployment(&'s Deployment),
    StatefulSet(&'s StatefulSet),
}

// === impl Snapshot ===

impl Snapshot {
    pub fn builder(namespace: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder(Snapshot {
            namespace: namespace.into(),
            ..Default::default()
        })
    }

    /// The namespace scope. The empty string denotes all namespaces.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn deployments(&self) -> &[Arc<Deployment>] {
        &self.deployments
    }

    pub fn stateful_sets(&self) -> &[Arc<StatefulSet>] {
        &self.stateful_sets
    }

    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    pub fn ingresses(&self) -> &[Arc<Ingress>] {
        &self.ingresses
    }

    pub fn config_maps(&self) -> &[Arc<ConfigMap>] {
        &self.config_maps
    }

    pub fn secrets(&self) -> &[Arc<Secret>] {
        &self.secrets
    }

    pub fn persistent_volume_claims(&self) -> &[Arc<PersistentVolumeClaim>] {
        &self.claims
    }

    /// Iterates over deployments and then stateful sets.
    pub fn workloads(&self) -> impl Iterator<Item = Workload<'_>> + '_ {
        let deployments = self.deployments.iter().map(|d| Workload::Deployment(d.as_ref()));
        let stateful_sets = self.stateful_sets.iter().map(|s| Workload::StatefulSet(s.as_ref()));
        deployments.chain(stateful_sets)
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
            && self.stateful_sets.is_empty()
            && self.services.is_empty()
            && self.ingresses.is_empty()
            && self.config_maps.is_empty()
            && self.secrets.is_empty()
            && self.claims.is_empty()
    }
}

// === impl SnapshotBuilder ===

impl SnapshotBuilder {
    pub fn deployment(mut self, r: impl Into<Arc<Deployment>>) -> Self {
        self.0.deployments.push(r.into());
        self
    }

    pub fn stateful_set(mut self, r: impl Into<Arc<StatefulSet>>) -> Self {
        self.0.stateful_sets.push(r.into());
        self
    }

    pub fn service(mut self, r: impl Into<Arc<Service>>) -> Self {
        self.0.services.push(r.into());
        self
    }

    pub fn ingress(mut self, r: impl Into<Arc<Ingress>>) -> Self {
        self.0.ingresses.push(r.into());
        self
    }

    pub fn config_map(mut self, r: impl Into<Arc<ConfigMap>>) -> Self {
        self.0.config_maps.push(r.into());
        self
    }

    pub fn secret(mut self, r: impl Into<Arc<Secret>>) -> Self {
        self.0.secrets.push(r.into());
        self
    }

    pub fn persistent_volume_claim(mut self, r: impl Into<Arc<PersistentVolumeClaim>>) -> Self {
        self.0.claims.push(r.into());
        self
    }

    pub fn build(self) -> Snapshot {
        self.0
    }
}

// === impl Workload ===

impl<'s> Workload<'s> {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Deployment(_) => Kind::Deployment,
            Self::StatefulSet(_) => Kind::StatefulSet,
        }
    }

    pub fn meta(&self) -> &'s ObjectMeta {
        match *self {
            Self::Deployment(d) => &d.metadata,
            Self::StatefulSet(s) => &s.metadata,
        }
    }

    pub fn template_labels(&self) -> k8s::Labels {
        match *self {
            Self::Deployment(d) => d.template_labels(),
            Self::StatefulSet(s) => s.template_labels(),
        }
    }

    pub fn pod_spec(&self) -> Option<&'s k8s::PodSpec> {
        match *self {
            Self::Deployment(d) => d.pod_spec(),
            Self::StatefulSet(s) => s.pod_spec(),
        }
    }
}
