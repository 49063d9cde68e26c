use crate::{
    api::TopologyApi,
    cache::MemoryCache,
    index::{Index, Rules},
    k8s,
    metrics::TopologyMetrics,
    service::TopologyService,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "topology", about = "Serves the topology of a cluster's resources")]
pub struct Args {
    #[clap(
        long,
        default_value = "cluster_topology=info,warn",
        env = "TOPOLOGY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// How long a computed topology is served from the cache.
    #[clap(long, default_value = "3600")]
    cache_ttl_secs: u64,

    /// Bounds each cache read and write.
    #[clap(long, default_value = "3000")]
    cache_timeout_ms: u64,

    #[clap(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    cache_purge_interval_secs: u64,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            cache_ttl_secs,
            cache_timeout_ms,
            cache_purge_interval_secs,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = TopologyMetrics::register(prom.sub_registry_with_prefix("topology"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_server(server)
            .build()
            .await?;

        let index = Index::shared();

        // Spawn resource watches. Snapshots fail until the initial listing of every watch has been
        // indexed.

        let deployments = runtime.watch_all::<k8s::Deployment>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), deployments)
                .instrument(info_span!("deployments")),
        );

        let stateful_sets = runtime.watch_all::<k8s::StatefulSet>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), stateful_sets)
                .instrument(info_span!("statefulsets")),
        );

        let services = runtime.watch_all::<k8s::Service>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), services)
                .instrument(info_span!("services")),
        );

        let ingresses = runtime.watch_all::<k8s::Ingress>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), ingresses)
                .instrument(info_span!("ingresses")),
        );

        let config_maps = runtime.watch_all::<k8s::ConfigMap>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), config_maps)
                .instrument(info_span!("configmaps")),
        );

        let secrets = runtime.watch_all::<k8s::Secret>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), secrets)
                .instrument(info_span!("secrets")),
        );

        let claims = runtime.watch_all::<k8s::PersistentVolumeClaim>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(index.clone(), claims)
                .instrument(info_span!("persistentvolumeclaims")),
        );

        let cache = Arc::new(MemoryCache::new(Duration::from_secs(cache_ttl_secs)));
        tokio::spawn(
            cache
                .clone()
                .run_purge(Duration::from_secs(cache_purge_interval_secs))
                .instrument(info_span!("cache")),
        );

        let rules = Rules::default();
        info!(?rules, ttl = ?cache.ttl(), "Serving topologies");
        let topology = Arc::new(
            TopologyService::new(rules, cache, metrics)
                .with_cache_timeout(Duration::from_millis(cache_timeout_ms)),
        );

        let runtime = runtime.spawn_server(TopologyApi::new(index, topology));

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
