use crate::{
    core::{TopologyStore, ALL_NAMESPACES},
    index::SnapshotProvider,
    service::{BuildError, TopologyService},
};
use bytes::Bytes;
use futures::future;
use hyper::{http, Request, Response};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tracing::{debug, trace, warn};

pub const TOPOLOGY_PATH: &str = "/api/v1/topology";

type Body = http_body_util::Full<Bytes>;

/// Serves topologies over HTTP.
///
/// `GET /api/v1/topology` responds with the topology of the namespace named by the optional
/// `namespace` query parameter, or of all namespaces when it is absent or empty.
pub struct TopologyApi<P, S> {
    snapshots: Arc<P>,
    topology: Arc<TopologyService<S>>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

// === impl TopologyApi ===

impl<P, S> TopologyApi<P, S>
where
    P: SnapshotProvider + Send + Sync + 'static,
    S: TopologyStore + 'static,
{
    pub fn new(snapshots: Arc<P>, topology: Arc<TopologyService<S>>) -> Self {
        Self {
            snapshots,
            topology,
        }
    }

    async fn topology(self, namespace: String) -> Result<Response<Body>, Error> {
        let res = match self.snapshots.take_snapshot(&namespace) {
            Ok(snapshot) => self.topology.build_from_snapshot(&snapshot).await,
            Err(error) => Err(BuildError::from(error)),
        };

        match res {
            Ok(graph) => {
                debug!(
                    %namespace,
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "Serving topology"
                );
                json_response(http::StatusCode::OK, serde_json::to_vec(&graph)?)
            }
            Err(error) => {
                warn!(%error, %namespace, "Failed to build topology");
                let body = serde_json::json!({ "error": error.to_string() });
                json_response(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::to_vec(&body)?,
                )
            }
        }
    }
}

impl<P, S> Clone for TopologyApi<P, S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: self.snapshots.clone(),
            topology: self.topology.clone(),
        }
    }
}

impl<P, S, B> tower::Service<Request<B>> for TopologyApi<P, S>
where
    P: SnapshotProvider + Send + Sync + 'static,
    S: TopologyStore + 'static,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), uri = %req.uri());
        if req.uri().path() != TOPOLOGY_PATH {
            return Box::pin(future::ok(empty_response(http::StatusCode::NOT_FOUND)));
        }
        if req.method() != http::Method::GET {
            return Box::pin(future::ok(empty_response(
                http::StatusCode::METHOD_NOT_ALLOWED,
            )));
        }

        let namespace = namespace_param(req.uri().query());
        Box::pin(self.clone().topology(namespace))
    }
}

/// Extracts the `namespace` query parameter. An absent parameter selects all namespaces.
fn namespace_param(query: Option<&str>) -> String {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "namespace")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| ALL_NAMESPACES.to_string())
}

fn json_response(status: http::StatusCode, body: Vec<u8>) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("json response must be valid"))
}

fn empty_response(status: http::StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::default())
        .expect("empty response must be valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::MemoryCache,
        core::{Graph, Kind, NodeId},
        index::{Index, Rules, Snapshot, SnapshotError},
        k8s::{ConfigMap, Deployment, Service},
        metrics::TopologyMetrics,
    };
    use http_body_util::BodyExt;
    use kubert::index::IndexNamespacedResource;
    use parking_lot::RwLock;
    use serde_json::json;
    use tokio::time::Duration;
    use tower::Service as _;

    fn resource<T>(mut value: serde_json::Value) -> T
    where
        T: k8s_openapi::Resource + serde::de::DeserializeOwned,
    {
        value["apiVersion"] = <T as k8s_openapi::Resource>::API_VERSION.into();
        value["kind"] = <T as k8s_openapi::Resource>::KIND.into();
        serde_json::from_value(value).expect("resource must be valid")
    }

    fn index() -> Arc<RwLock<Index>> {
        let mut index = Index::default();
        for kind in Kind::ALL {
            index.mark_synced(kind);
        }

        index.apply(resource::<Deployment>(json!({
            "metadata": {"namespace": "shop", "name": "api"},
            "spec": {
                "selector": {"matchLabels": {"app": "api"}},
                "template": {
                    "metadata": {"labels": {"app": "api"}},
                    "spec": {
                        "containers": [{"name": "api"}],
                        "volumes": [{"name": "cfg", "configMap": {"name": "api-config"}}],
                    },
                },
            },
        })));
        index.apply(resource::<Service>(json!({
            "metadata": {"namespace": "shop", "name": "api"},
            "spec": {"selector": {"app": "api"}},
        })));
        index.apply(resource::<ConfigMap>(json!({
            "metadata": {"namespace": "shop", "name": "api-config"},
        })));
        index.apply(resource::<Service>(json!({
            "metadata": {"namespace": "other", "name": "db"},
        })));

        Arc::new(RwLock::new(index))
    }

    fn api<P: SnapshotProvider + Send + Sync + 'static>(
        snapshots: Arc<P>,
    ) -> TopologyApi<P, MemoryCache> {
        let topology = TopologyService::new(
            Rules::default(),
            MemoryCache::new(Duration::from_secs(60)),
            TopologyMetrics::default(),
        );
        TopologyApi::new(snapshots, Arc::new(topology))
    }

    async fn get(
        svc: &mut TopologyApi<impl SnapshotProvider + Send + Sync + 'static, MemoryCache>,
        uri: &str,
    ) -> (http::StatusCode, Bytes) {
        let rsp = svc
            .call(Request::get(uri).body(()).unwrap())
            .await
            .expect("service must not fail");
        let status = rsp.status();
        let body = rsp.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    #[tokio::test]
    async fn serves_namespace_topology() {
        let mut svc = api(index());
        let (status, body) = get(&mut svc, "/api/v1/topology?namespace=shop").await;
        assert_eq!(status, http::StatusCode::OK);

        let graph = serde_json::from_slice::<Graph>(&body).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.has_edge(
            &NodeId::new(Kind::Deployment, "shop", "api"),
            &NodeId::new(Kind::Service, "shop", "api"),
        ));
        assert!(graph.has_edge(
            &NodeId::new(Kind::Deployment, "shop", "api"),
            &NodeId::new(Kind::ConfigMap, "shop", "api-config"),
        ));
    }

    #[tokio::test]
    async fn serves_all_namespaces() {
        let mut svc = api(index());
        for uri in [
            "/api/v1/topology",
            "/api/v1/topology?namespace=",
            "/api/v1/topology?other=1",
        ] {
            let (status, body) = get(&mut svc, uri).await;
            assert_eq!(status, http::StatusCode::OK, "{uri}");
            let graph = serde_json::from_slice::<Graph>(&body).unwrap();
            assert_eq!(graph.nodes.len(), 4, "{uri}");
            assert!(graph
                .node(&NodeId::new(Kind::Service, "other", "db"))
                .is_some());
        }
    }

    #[tokio::test]
    async fn unknown_namespace_is_empty() {
        let mut svc = api(index());
        let (status, body) = get(&mut svc, "/api/v1/topology?namespace=missing").await;
        assert_eq!(status, http::StatusCode::OK);
        let body = serde_json::from_slice::<serde_json::Value>(&body).unwrap();
        assert_eq!(body, json!({"nodes": [], "edges": []}));
    }

    #[tokio::test]
    async fn unsynced_index_is_an_error() {
        let mut svc = api(Arc::new(RwLock::new(Index::default())));
        let (status, body) = get(&mut svc, "/api/v1/topology?namespace=shop").await;
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::from_slice::<serde_json::Value>(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("initial sync"));
    }

    #[tokio::test]
    async fn rejects_other_routes() {
        let mut svc = api(index());
        let (status, _) = get(&mut svc, "/api/v1/other").await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);

        let rsp = svc
            .call(
                Request::post("/api/v1/topology?namespace=shop")
                    .body(())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rsp.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn parses_namespace_param() {
        assert_eq!(namespace_param(None), "");
        assert_eq!(namespace_param(Some("namespace=a")), "a");
        assert_eq!(namespace_param(Some("x=1&namespace=kube%2Dsystem")), "kube-system");
        assert_eq!(namespace_param(Some("x=1")), "");
    }

    struct Fixed(Result<(), Kind>);

    impl SnapshotProvider for Fixed {
        fn take_snapshot(&self, namespace: &str) -> Result<Snapshot, SnapshotError> {
            match self.0 {
                Ok(()) => Ok(Snapshot::builder(namespace).build()),
                Err(kind) => Err(SnapshotError::NotSynced { kind }),
            }
        }
    }

    #[tokio::test]
    async fn provider_errors_are_reported() {
        let mut svc = api(Arc::new(Fixed(Err(Kind::Secret))));
        let (status, body) = get(&mut svc, "/api/v1/topology").await;
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::from_slice::<serde_json::Value>(&body).unwrap();
        assert_eq!(
            body,
            json!({"error": "Secret cache has not completed its initial sync"})
        );

        let mut svc = api(Arc::new(Fixed(Ok(()))));
        let (status, _) = get(&mut svc, "/api/v1/topology").await;
        assert_eq!(status, http::StatusCode::OK);
    }
}
