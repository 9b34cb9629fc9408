//! Sherpack ObjectMatch - decide whether a workload needs to be updated
//!
//! Comparing a rendered manifest with the object read back from the cluster
//! byte for byte reports a difference on every run: the API server injects
//! defaults and controllers add their own annotations. This crate answers the
//! single question "is an update required?" by:
//!
//! - **Defaulting** the desired object the way the API server would
//! - **Sanitizing** controller-owned annotations off the live object
//! - **Reducing** metadata on both sides to the fields that matter
//! - **Canonicalizing** `{metadata, spec}` into sorted-key JSON
//! - **Comparing** the two documents with a pluggable JSON engine
//!
//! # Example
//!
//! ```no_run
//! use k8s_openapi::api::apps::v1::Deployment;
//! use sherpack_objectmatch::{Matcher, ObjectMatcher};
//!
//! # fn run(live: &Deployment, desired: &Deployment) -> sherpack_objectmatch::Result<()> {
//! let matcher = ObjectMatcher::default().deployment_matcher();
//! if !matcher.matches(live, desired)? {
//!     // issue the update
//! }
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod compare;
pub mod config;
pub mod defaults;
pub mod error;
pub mod matcher;
pub mod meta;
pub mod resource;
pub mod sanitize;

pub use canonical::{Canonical, canonicalize};
pub use compare::{JsonComparator, MergePatchComparator};
pub use config::MatcherConfig;
pub use defaults::{Defaulter, NoDefaults};
pub use error::{CompareError, ConfigError, MatchError, Result, Side};
pub use matcher::{Matcher, ObjectMatcher, ResourceMatcher, WorkingCopy};
pub use meta::{MetaReducer, ReducedMeta, StandardMetaReducer};
pub use resource::WorkloadResource;
pub use sanitize::Sanitizer;
