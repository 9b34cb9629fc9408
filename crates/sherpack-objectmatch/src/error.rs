//! Error types for sherpack-objectmatch

use std::fmt;

use thiserror::Error;

/// Result type for match operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// Which side of a comparison an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The live object, as read back from the cluster
    Old,
    /// The desired object, as rendered by the caller
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

/// Errors that can occur while matching two objects
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MatchError {
    /// One side could not be encoded into its canonical form
    #[error("could not marshal {side} object '{name}': {source}")]
    Serialization {
        side: Side,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The comparison engine rejected its input
    #[error("could not match objects '{name}': {source}")]
    Comparison {
        name: String,
        #[source]
        source: CompareError,
    },
}

impl MatchError {
    /// Name of the object the failure refers to
    pub fn object_name(&self) -> &str {
        match self {
            MatchError::Serialization { name, .. } | MatchError::Comparison { name, .. } => name,
        }
    }

    /// Side that failed to serialize, if this is a serialization error
    pub fn side(&self) -> Option<Side> {
        match self {
            MatchError::Serialization { side, .. } => Some(*side),
            _ => None,
        }
    }
}

/// Errors raised by a [`JsonComparator`](crate::compare::JsonComparator)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompareError {
    /// A canonical blob was not valid JSON
    #[error("invalid {side} document: {source}")]
    InvalidJson {
        side: Side,
        #[source]
        source: serde_json::Error,
    },

    /// Engine-specific failure
    #[error("{0}")]
    Engine(String),
}

/// Errors raised while loading a [`MatcherConfig`](crate::config::MatcherConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse matcher config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
