//! Metadata reduction
//!
//! Only a handful of metadata fields say anything about what the user asked
//! for. Everything else (uid, resourceVersion, generation, managedFields,
//! timestamps) is server bookkeeping and is dropped before comparison.

use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use serde::Serialize;

use crate::sanitize::kubernetes;

/// The comparable subset of an object's metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// Reduces full metadata to the fields relevant for equality
///
/// Every matcher shares one reducer so all kinds follow the same metadata
/// rules. Implementations must not depend on anything but `meta`.
pub trait MetaReducer: Send + Sync {
    fn reduce(&self, meta: &ObjectMeta) -> ReducedMeta;
}

/// Keeps name, namespace, labels, annotations and owner references
#[derive(Debug, Clone)]
pub struct StandardMetaReducer {
    excluded_annotations: BTreeSet<String>,
    owner_references: bool,
}

impl StandardMetaReducer {
    /// Reducer that drops kubectl's last-applied annotation and keeps owner references
    pub fn new() -> Self {
        Self {
            excluded_annotations: BTreeSet::from([
                kubernetes::LAST_APPLIED_CONFIGURATION.to_string()
            ]),
            owner_references: true,
        }
    }

    /// Replace the set of annotations that are never compared
    pub fn with_excluded_annotations<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_annotations = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Whether owner references take part in the comparison
    pub fn with_owner_references(mut self, enabled: bool) -> Self {
        self.owner_references = enabled;
        self
    }
}

impl Default for StandardMetaReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaReducer for StandardMetaReducer {
    fn reduce(&self, meta: &ObjectMeta) -> ReducedMeta {
        let annotations = meta
            .annotations
            .iter()
            .flatten()
            .filter(|(key, _)| !self.excluded_annotations.contains(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let owner_references = if self.owner_references {
            meta.owner_references.clone().unwrap_or_default()
        } else {
            Vec::new()
        };

        ReducedMeta {
            name: meta.name.clone(),
            namespace: meta.namespace.clone(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations,
            owner_references,
        }
    }
}
