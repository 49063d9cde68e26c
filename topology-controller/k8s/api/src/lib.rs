#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;

pub use self::labels::{Labels, Selector};
pub use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec},
    core::v1::{
        ConfigMap, Container, EnvFromSource, EnvVar, PersistentVolumeClaim, PodSpec,
        PodTemplateSpec, Secret, Service, ServiceSpec, Volume,
    },
    networking::v1::{Ingress, IngressSpec},
};
pub use kube::{
    api::ObjectMeta,
    runtime::watcher,
    Resource, ResourceExt,
};

/// Returns the pod template of a workload, if one is set.
pub trait PodTemplate {
    fn pod_template(&self) -> Option<&PodTemplateSpec>;

    /// Returns the pod template's labels.
    fn template_labels(&self) -> Labels {
        self.pod_template()
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.labels.as_ref())
            .map(|l| Labels::from(l.clone()))
            .unwrap_or_default()
    }

    /// Returns the pod template's spec.
    fn pod_spec(&self) -> Option<&PodSpec> {
        self.pod_template().and_then(|t| t.spec.as_ref())
    }
}

impl PodTemplate for Deployment {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
}

impl PodTemplate for StatefulSet {
    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
}
