//! Server-side defaulting for desired objects
//!
//! A live object has been through admission and carries every default the API
//! server fills in. A desired object usually omits them. Defaulting the desired
//! copy before comparison keeps omitted-but-defaulted fields from showing up as
//! differences:
//!
//! ```text
//!   desired (as authored)          desired (defaulted)          live
//!   replicas: <unset>       ──►    replicas: 1           ==     replicas: 1
//!   strategy: <unset>       ──►    strategy: RollingUpdate ==   strategy: RollingUpdate
//! ```

mod apps;
mod pod;
mod quantity;

pub use apps::{default_daemon_set, default_deployment, default_stateful_set};
pub use pod::{
    DEFAULT_FILE_MODE, default_container, default_pod_spec, default_pod_template,
    image_pull_policy,
};
pub use quantity::{
    canonical_quantity, canonicalize_quantities, canonicalize_quantity, canonicalize_resources,
};

/// Fills in fields the control plane would populate on admission
///
/// Defaulting is total: it never fails and never overwrites a value that is
/// already set.
pub trait Defaulter<K>: Send + Sync {
    /// Apply defaults to `object` in place
    fn apply(&self, object: &mut K);
}

impl<K, F> Defaulter<K> for F
where
    F: Fn(&mut K) + Send + Sync,
{
    fn apply(&self, object: &mut K) {
        self(object)
    }
}

/// Defaulter for kinds the API server does not default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDefaults;

impl<K> Defaulter<K> for NoDefaults {
    fn apply(&self, _object: &mut K) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};

    #[test]
    fn test_function_as_defaulter() {
        let defaulter: Box<dyn Defaulter<Deployment>> = Box::new(default_deployment);
        let mut deployment = Deployment {
            spec: Some(DeploymentSpec::default()),
            ..Default::default()
        };
        defaulter.apply(&mut deployment);
        assert_eq!(deployment.spec.unwrap().replicas, Some(1));
    }

    #[test]
    fn test_no_defaults() {
        let mut deployment = Deployment {
            spec: Some(DeploymentSpec::default()),
            ..Default::default()
        };
        NoDefaults.apply(&mut deployment);
        assert_eq!(deployment.spec.unwrap().replicas, None);
    }
}
