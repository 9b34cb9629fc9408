//! Matcher configuration
//!
//! Lets the surrounding system extend the built-in rules without code
//! changes, e.g. when another controller starts writing its own annotations
//! onto live objects:
//!
//! ```yaml
//! sanitizedAnnotations:
//!   Deployment:
//!     - example.com/rollout-id
//! excludedAnnotations:
//!   - kubectl.kubernetes.io/last-applied-configuration
//! compareOwnerReferences: true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use serde::{Deserialize, Serialize};

use crate::compare::MergePatchComparator;
use crate::error::ConfigError;
use crate::matcher::{ObjectMatcher, ResourceMatcher};
use crate::meta::StandardMetaReducer;
use crate::sanitize::{Sanitizer, kubernetes};

/// Configuration for building matchers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherConfig {
    /// Extra live-only annotation keys per kind, on top of the built-in ones
    #[serde(default)]
    pub sanitized_annotations: BTreeMap<String, Vec<String>>,

    /// Annotations the metadata reducer never compares
    #[serde(default = "default_excluded_annotations")]
    pub excluded_annotations: Vec<String>,

    /// Whether owner references take part in the comparison
    #[serde(default = "default_true")]
    pub compare_owner_references: bool,
}

fn default_excluded_annotations() -> Vec<String> {
    vec![kubernetes::LAST_APPLIED_CONFIGURATION.to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            sanitized_annotations: BTreeMap::new(),
            excluded_annotations: default_excluded_annotations(),
            compare_owner_references: true,
        }
    }
}

impl MatcherConfig {
    /// Parse configuration from YAML
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "loaded matcher config");
        Ok(config)
    }

    /// Shared collaborators built from this configuration
    pub fn object_matcher(&self) -> ObjectMatcher {
        let reducer = StandardMetaReducer::new()
            .with_excluded_annotations(self.excluded_annotations.iter().cloned())
            .with_owner_references(self.compare_owner_references);
        ObjectMatcher::new(Arc::new(reducer), Arc::new(MergePatchComparator::new()))
    }

    /// Built-in annotation keys for `kind` plus the configured extras
    pub fn sanitizer_for(&self, kind: &str) -> Sanitizer {
        let extra = self
            .sanitized_annotations
            .get(kind)
            .into_iter()
            .flatten()
            .cloned();
        Sanitizer::for_kind(kind).with_keys(extra)
    }

    pub fn deployment_matcher(&self) -> ResourceMatcher<Deployment> {
        self.object_matcher()
            .deployment_matcher()
            .with_sanitized_keys(self.extra_keys("Deployment"))
    }

    pub fn stateful_set_matcher(&self) -> ResourceMatcher<StatefulSet> {
        self.object_matcher()
            .stateful_set_matcher()
            .with_sanitized_keys(self.extra_keys("StatefulSet"))
    }

    pub fn daemon_set_matcher(&self) -> ResourceMatcher<DaemonSet> {
        self.object_matcher()
            .daemon_set_matcher()
            .with_sanitized_keys(self.extra_keys("DaemonSet"))
    }

    fn extra_keys(&self, kind: &str) -> Vec<String> {
        self.sanitized_annotations
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MatcherConfig::from_yaml("{}").unwrap();
        assert_eq!(config, MatcherConfig::default());
        assert!(config.compare_owner_references);
        assert_eq!(
            config.excluded_annotations,
            vec![kubernetes::LAST_APPLIED_CONFIGURATION.to_string()]
        );
    }

    #[test]
    fn test_parse_config() {
        let config = MatcherConfig::from_yaml(
            r#"
sanitizedAnnotations:
  Deployment:
    - example.com/rollout-id
excludedAnnotations: []
compareOwnerReferences: false
"#,
        )
        .unwrap();

        assert!(!config.compare_owner_references);
        assert!(config.excluded_annotations.is_empty());

        let sanitizer = config.sanitizer_for("Deployment");
        assert!(sanitizer.contains("example.com/rollout-id"));
        assert!(sanitizer.contains(kubernetes::DEPLOYMENT_REVISION));
        assert!(!config.sanitizer_for("DaemonSet").contains("example.com/rollout-id"));

        assert_eq!(
            config.deployment_matcher().sanitizer(),
            &config.sanitizer_for("Deployment")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sanitizedAnnotations:\n  StatefulSet: [example.com/owner]").unwrap();

        let config = MatcherConfig::load_from(file.path()).unwrap();
        assert_eq!(
            config.sanitized_annotations.get("StatefulSet"),
            Some(&vec!["example.com/owner".to_string()])
        );
    }

    #[test]
    fn test_invalid_config() {
        let err = MatcherConfig::from_yaml("compareOwnerReferences: maybe").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = MatcherConfig::load_from(Path::new("/nonexistent/matcher.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
