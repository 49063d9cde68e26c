#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod graph;
pub mod store;

pub use self::{
    graph::{Edge, Graph, GraphBuilder, Kind, Node, NodeId},
    store::{CacheError, TopologyStore},
};

/// Prefixes every namespace scope to form a cache key.
pub const CACHE_KEY_PREFIX: &str = "topology:";

/// The namespace scope that denotes all namespaces.
pub const ALL_NAMESPACES: &str = "";

/// Forms the cache key for a namespace scope.
#[inline]
pub fn cache_key(namespace: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{namespace}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys() {
        assert_eq!(cache_key("default"), "topology:default");
        assert_eq!(cache_key(ALL_NAMESPACES), "topology:");
    }
}
