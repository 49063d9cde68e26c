use crate::snapshot::{Snapshot, SnapshotBuilder};
use ahash::AHashSet as HashSet;
use cluster_topology_core::{Kind, ALL_NAMESPACES};
use cluster_topology_k8s_api::{
    ConfigMap, Deployment, Ingress, PersistentVolumeClaim, ResourceExt, Secret, Service,
    StatefulSet,
};
use kubert::index::{IndexNamespacedResource, NamespacedRemoved};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Produces a [`Snapshot`] for a namespace scope.
pub trait SnapshotProvider {
    fn take_snapshot(&self, namespace: &str) -> Result<Snapshot, SnapshotError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("{kind} cache has not completed its initial sync")]
    NotSynced { kind: Kind },
}

/// Holds the most recently observed state of every tracked resource, by namespace.
///
/// Updated by one watch task per kind. Each kind is considered synced once the initial listing
/// from its watch has been indexed.
#[derive(Debug, Default)]
pub struct Index {
    namespaces: BTreeMap<String, NamespaceIndex>,
    synced: HashSet<Kind>,
}

/// Resources within a single namespace, ordered by name.
#[derive(Debug, Default)]
pub struct NamespaceIndex {
    deployments: BTreeMap<String, Arc<Deployment>>,
    stateful_sets: BTreeMap<String, Arc<StatefulSet>>,
    services: BTreeMap<String, Arc<Service>>,
    ingresses: BTreeMap<String, Arc<Ingress>>,
    config_maps: BTreeMap<String, Arc<ConfigMap>>,
    secrets: BTreeMap<String, Arc<Secret>>,
    claims: BTreeMap<String, Arc<PersistentVolumeClaim>>,
}

/// Associates a tracked resource type with its topology kind and namespace store.
pub trait Tracked: ResourceExt + Sized {
    const KIND: Kind;

    #[doc(hidden)]
    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>>;
}

// === impl Index ===

impl Index {
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn mark_synced(&mut self, kind: Kind) {
        if self.synced.insert(kind) {
            info!(%kind, "Cache synced");
        }
    }

    pub fn is_synced(&self, kind: Kind) -> bool {
        self.synced.contains(&kind)
    }

    fn snapshot_ns(builder: SnapshotBuilder, ns: &NamespaceIndex) -> SnapshotBuilder {
        let builder = ns
            .deployments
            .values()
            .fold(builder, |b, r| b.deployment(r.clone()));
        let builder = ns
            .stateful_sets
            .values()
            .fold(builder, |b, r| b.stateful_set(r.clone()));
        let builder = ns.services.values().fold(builder, |b, r| b.service(r.clone()));
        let builder = ns.ingresses.values().fold(builder, |b, r| b.ingress(r.clone()));
        let builder = ns
            .config_maps
            .values()
            .fold(builder, |b, r| b.config_map(r.clone()));
        let builder = ns.secrets.values().fold(builder, |b, r| b.secret(r.clone()));
        ns.claims
            .values()
            .fold(builder, |b, r| b.persistent_volume_claim(r.clone()))
    }
}

impl SnapshotProvider for Index {
    fn take_snapshot(&self, namespace: &str) -> Result<Snapshot, SnapshotError> {
        if let Some(kind) = Kind::ALL.into_iter().find(|k| !self.is_synced(*k)) {
            return Err(SnapshotError::NotSynced { kind });
        }

        let builder = Snapshot::builder(namespace);
        let builder = if namespace == ALL_NAMESPACES {
            self.namespaces
                .values()
                .fold(builder, |b, ns| Self::snapshot_ns(b, ns))
        } else {
            match self.namespaces.get(namespace) {
                Some(ns) => Self::snapshot_ns(builder, ns),
                None => builder,
            }
        };
        Ok(builder.build())
    }
}

impl<P: SnapshotProvider> SnapshotProvider for RwLock<P> {
    fn take_snapshot(&self, namespace: &str) -> Result<Snapshot, SnapshotError> {
        self.read().take_snapshot(namespace)
    }
}

impl<P: SnapshotProvider + ?Sized> SnapshotProvider for Arc<P> {
    fn take_snapshot(&self, namespace: &str) -> Result<Snapshot, SnapshotError> {
        (**self).take_snapshot(namespace)
    }
}

impl<T: Tracked> IndexNamespacedResource<T> for Index {
    fn apply(&mut self, resource: T) {
        let Some(namespace) = resource.namespace() else {
            warn!(kind = %T::KIND, name = %resource.name_any(), "Ignoring resource without a namespace");
            return;
        };
        let name = resource.name_any();
        debug!(kind = %T::KIND, %namespace, %name, "Indexing");

        let ns = self.namespaces.entry(namespace).or_default();
        T::store(ns).insert(name, Arc::new(resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        debug!(kind = %T::KIND, %namespace, %name, "Removing");
        if let Some(ns) = self.namespaces.get_mut(&namespace) {
            T::store(ns).remove(&name);
            if ns.is_empty() {
                self.namespaces.remove(&namespace);
            }
        }
    }

    /// Applies a complete listing and only then marks the kind synced, so that no snapshot
    /// observes the kind before its listing is indexed.
    fn reset(&mut self, resources: Vec<T>, removed: NamespacedRemoved) {
        for resource in resources {
            <Self as IndexNamespacedResource<T>>::apply(self, resource);
        }
        for (namespace, names) in removed {
            for name in names {
                <Self as IndexNamespacedResource<T>>::delete(self, namespace.clone(), name);
            }
        }
        self.mark_synced(T::KIND);
    }
}

// === impl NamespaceIndex ===

impl NamespaceIndex {
    fn is_empty(&self) -> bool {
        self.deployments.is_empty()
            && self.stateful_sets.is_empty()
            && self.services.is_empty()
            && self.ingresses.is_empty()
            && self.config_maps.is_empty()
            && self.secrets.is_empty()
            && self.claims.is_empty()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.deployments.len()
            + self.stateful_sets.len()
            + self.services.len()
            + self.ingresses.len()
            + self.config_maps.len()
            + self.secrets.len()
            + self.claims.len()
    }
}

// === impl Tracked ===

impl Tracked for Deployment {
    const KIND: Kind = Kind::Deployment;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.deployments
    }
}

impl Tracked for StatefulSet {
    const KIND: Kind = Kind::StatefulSet;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.stateful_sets
    }
}

impl Tracked for Service {
    const KIND: Kind = Kind::Service;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.services
    }
}

impl Tracked for Ingress {
    const KIND: Kind = Kind::Ingress;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.ingresses
    }
}

impl Tracked for ConfigMap {
    const KIND: Kind = Kind::ConfigMap;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.config_maps
    }
}

impl Tracked for Secret {
    const KIND: Kind = Kind::Secret;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.secrets
    }
}

impl Tracked for PersistentVolumeClaim {
    const KIND: Kind = Kind::PersistentVolumeClaim;

    fn store(ns: &mut NamespaceIndex) -> &mut BTreeMap<String, Arc<Self>> {
        &mut ns.claims
    }
}
