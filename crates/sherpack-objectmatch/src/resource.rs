//! Workload kinds the matcher knows how to take apart

use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec,
};
use kube::{Resource, ResourceExt};
use serde::Serialize;

/// A namespaced workload with a user-controlled spec
///
/// Metadata access comes from [`kube::Resource`]; implementors only have to
/// expose the `spec` document that ends up in the comparison.
pub trait WorkloadResource: Resource<DynamicType = ()> + Clone + Send + Sync {
    /// The desired-state document of this kind
    type Spec: Serialize;

    /// The spec, if the object has one
    fn spec(&self) -> Option<&Self::Spec>;

    /// Name used in errors and log fields
    fn display_name(&self) -> String {
        self.name_any()
    }

    /// Kind string, e.g. `Deployment`
    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

impl WorkloadResource for Deployment {
    type Spec = DeploymentSpec;

    fn spec(&self) -> Option<&DeploymentSpec> {
        self.spec.as_ref()
    }
}

impl WorkloadResource for StatefulSet {
    type Spec = StatefulSetSpec;

    fn spec(&self) -> Option<&StatefulSetSpec> {
        self.spec.as_ref()
    }
}

impl WorkloadResource for DaemonSet {
    type Spec = DaemonSetSpec;

    fn spec(&self) -> Option<&DaemonSetSpec> {
        self.spec.as_ref()
    }
}
