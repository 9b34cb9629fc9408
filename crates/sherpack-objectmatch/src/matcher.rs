//! Live-versus-desired matching
//!
//! ```text
//!   live ────► copy ──► sanitize ──► reduce ──► canonicalize ──┐
//!                                                              ├──► compare ──► bool
//!   desired ─► copy ──► default ───► reduce ──► canonicalize ──┘
//! ```
//!
//! Each call works on private copies of its inputs and holds no state between
//! calls, so one matcher can be shared across threads.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use kube::Resource;

use crate::canonical::canonicalize;
use crate::compare::{JsonComparator, MergePatchComparator};
use crate::defaults::{Defaulter, default_daemon_set, default_deployment, default_stateful_set};
use crate::error::{MatchError, Result, Side};
use crate::meta::{MetaReducer, StandardMetaReducer};
use crate::resource::WorkloadResource;
use crate::sanitize::Sanitizer;

/// Decides whether a desired object needs to be written
pub trait Matcher<K>: Send + Sync {
    /// `true` when `desired` is semantically equal to `live`
    fn matches(&self, live: &K, desired: &K) -> Result<bool>;
}

/// Private deep copy of a caller's object
///
/// The only thing the pipeline ever mutates.
#[derive(Debug)]
pub struct WorkingCopy<K>(K);

impl<K: Clone> WorkingCopy<K> {
    /// Clone `object` into a copy owned by the current call
    pub fn of(object: &K) -> Self {
        Self(object.clone())
    }
}

impl<K> WorkingCopy<K> {
    pub fn get(&self) -> &K {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut K {
        &mut self.0
    }

    pub fn into_inner(self) -> K {
        self.0
    }
}

/// Collaborators shared by every kind-specific matcher
#[derive(Clone)]
pub struct ObjectMatcher {
    reducer: Arc<dyn MetaReducer>,
    comparator: Arc<dyn JsonComparator>,
}

impl ObjectMatcher {
    pub fn new(reducer: Arc<dyn MetaReducer>, comparator: Arc<dyn JsonComparator>) -> Self {
        Self {
            reducer,
            comparator,
        }
    }

    pub fn reducer(&self) -> &dyn MetaReducer {
        self.reducer.as_ref()
    }

    pub fn comparator(&self) -> &dyn JsonComparator {
        self.comparator.as_ref()
    }

    /// Matcher for Deployments with the built-in defaults and annotation keys
    pub fn deployment_matcher(&self) -> ResourceMatcher<Deployment> {
        ResourceMatcher::new(self.clone(), default_deployment, Sanitizer::deployment())
    }

    /// Matcher for StatefulSets with the built-in defaults and annotation keys
    pub fn stateful_set_matcher(&self) -> ResourceMatcher<StatefulSet> {
        ResourceMatcher::new(self.clone(), default_stateful_set, Sanitizer::stateful_set())
    }

    /// Matcher for DaemonSets with the built-in defaults and annotation keys
    pub fn daemon_set_matcher(&self) -> ResourceMatcher<DaemonSet> {
        ResourceMatcher::new(self.clone(), default_daemon_set, Sanitizer::daemon_set())
    }
}

impl Default for ObjectMatcher {
    fn default() -> Self {
        Self::new(
            Arc::new(StandardMetaReducer::new()),
            Arc::new(MergePatchComparator::new()),
        )
    }
}

impl std::fmt::Debug for ObjectMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectMatcher").finish_non_exhaustive()
    }
}

/// Matcher for one workload kind
///
/// Composes the shared [`ObjectMatcher`] with the kind's defaulting function
/// and the set of controller-owned annotations to strip from live objects.
pub struct ResourceMatcher<K> {
    objects: ObjectMatcher,
    defaulter: Box<dyn Defaulter<K>>,
    sanitizer: Sanitizer,
}

impl<K: WorkloadResource> ResourceMatcher<K> {
    pub fn new(
        objects: ObjectMatcher,
        defaulter: impl Defaulter<K> + 'static,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            objects,
            defaulter: Box::new(defaulter),
            sanitizer,
        }
    }

    /// Strip additional annotation keys from live objects
    pub fn with_sanitized_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sanitizer = self.sanitizer.with_keys(keys);
        self
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Compare `live` against `desired`
    ///
    /// Neither input is modified. Returns an error, never a partial answer,
    /// when either side cannot be encoded or the comparison engine fails.
    pub fn match_objects(&self, live: &K, desired: &K) -> Result<bool> {
        let mut old = WorkingCopy::of(live);
        let mut new = WorkingCopy::of(desired);

        let name = new.get().display_name();
        let span = tracing::trace_span!("match", kind = %K::kind_name(), name = %name);
        let _enter = span.enter();

        self.defaulter.apply(new.get_mut());
        self.sanitizer.apply(old.get_mut().meta_mut());

        let reducer = self.objects.reducer();
        let old_meta = reducer.reduce(old.get().meta());
        let new_meta = reducer.reduce(new.get().meta());

        let old_data = canonicalize(&old_meta, old.get().spec()).map_err(|source| {
            MatchError::Serialization {
                side: Side::Old,
                name: old.get().display_name(),
                source,
            }
        })?;
        let new_data = canonicalize(&new_meta, new.get().spec()).map_err(|source| {
            MatchError::Serialization {
                side: Side::New,
                name: name.clone(),
                source,
            }
        })?;

        let matched = self
            .objects
            .comparator()
            .match_json(&old_data.bytes, &new_data.bytes, &new_data.value)
            .map_err(|source| MatchError::Comparison {
                name: name.clone(),
                source,
            })?;

        tracing::trace!(matched, "compared objects");
        Ok(matched)
    }
}

impl<K: WorkloadResource> Matcher<K> for ResourceMatcher<K> {
    fn matches(&self, live: &K, desired: &K) -> Result<bool> {
        self.match_objects(live, desired)
    }
}

impl<K> std::fmt::Debug for ResourceMatcher<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMatcher")
            .field("sanitizer", &self.sanitizer)
            .finish_non_exhaustive()
    }
}
