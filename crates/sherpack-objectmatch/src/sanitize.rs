//! Controller-owned annotations stripped from live objects
//!
//! These keys are written by the control plane after admission and never
//! appear in a desired object, so they are removed from the live copy before
//! comparison.

use std::collections::BTreeSet;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Annotations written by Kubernetes controllers
pub mod kubernetes {
    /// Rollout revision set by the Deployment controller
    pub const DEPLOYMENT_REVISION: &str = "deployment.kubernetes.io/revision";
    /// Leader-election lock record
    pub const LEADER: &str = "control-plane.alpha.kubernetes.io/leader";
    /// Template generation set by the DaemonSet controller
    pub const DAEMONSET_TEMPLATE_GENERATION: &str = "deprecated.daemonset.template.generation";
    /// Client-side apply bookkeeping written by kubectl
    pub const LAST_APPLIED_CONFIGURATION: &str =
        "kubectl.kubernetes.io/last-applied-configuration";
}

/// Removes a fixed set of annotation keys from object metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitizer {
    keys: BTreeSet<String>,
}

impl Sanitizer {
    /// Create a sanitizer for the given keys
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Keys removed from Deployments
    pub fn deployment() -> Self {
        Self::new([kubernetes::DEPLOYMENT_REVISION, kubernetes::LEADER])
    }

    /// Keys removed from StatefulSets
    pub fn stateful_set() -> Self {
        Self::new([kubernetes::LEADER])
    }

    /// Keys removed from DaemonSets
    pub fn daemon_set() -> Self {
        Self::new([kubernetes::DAEMONSET_TEMPLATE_GENERATION, kubernetes::LEADER])
    }

    /// Built-in keys for a kind, empty for kinds without known controller annotations
    pub fn for_kind(kind: &str) -> Self {
        match kind {
            "Deployment" => Self::deployment(),
            "StatefulSet" => Self::stateful_set(),
            "DaemonSet" => Self::daemon_set(),
            _ => Self::default(),
        }
    }

    /// Add more keys to this set
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Keys this sanitizer removes
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Check if a key is removed by this sanitizer
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Remove the configured annotation keys from `meta`
    ///
    /// Absent keys and absent annotation maps are left alone.
    pub fn apply(&self, meta: &mut ObjectMeta) {
        if let Some(annotations) = meta.annotations.as_mut() {
            annotations.retain(|key, _| !self.keys.contains(key));
        }
    }
}
