//! Cluster topology derivation.
//!
//! The index watches the following resources and serves point-in-time [`Snapshot`]s of them:
//!
//! - `Deployment` and `StatefulSet` workloads;
//! - `Service` and `Ingress` network resources;
//! - `ConfigMap`, `Secret` and `PersistentVolumeClaim` resources that workloads consume.
//!
//! [`Rules`] derive a topology graph from a snapshot. Each rule contributes one kind of
//! relationship:
//!
//! ```text
//! [ Ingress ] -> [ Service ] <- [ Deployment | StatefulSet ] -> [ ConfigMap | Secret | PVC ]
//! ```
//!
//! Each kind is synchronized independently, so a snapshot may observe kinds at different points in
//! time. Rules tolerate references to resources that are absent from the snapshot; such edges are
//! emitted without a corresponding node.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
pub mod rules;
mod snapshot;


pub use self::{
    index::{Index, NamespaceIndex, SharedIndex, SnapshotError, SnapshotProvider, Tracked},
    rules::{Rule, RuleError, RuleFailure, Rules},
    snapshot::{Snapshot, SnapshotBuilder, Workload},
};
