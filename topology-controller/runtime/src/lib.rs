#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use cluster_topology_core as core;
pub use cluster_topology_k8s_api as k8s;
pub use cluster_topology_k8s_index as index;

mod api;
mod args;
mod cache;
mod metrics;
mod service;

pub use self::{
    api::{TopologyApi, TOPOLOGY_PATH},
    args::Args,
    cache::MemoryCache,
    metrics::TopologyMetrics,
    service::{BuildError, SharedTopologyService, TopologyService, DEFAULT_CACHE_TIMEOUT},
};
