///! Error types shared by the catalog and conjunction modules
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a feed source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("no URL configured for feed '{0}'")]
    UnknownFeed(String),

    #[error("no element sets found for {0}")]
    NotFound(String),
}

/// Structural rejection of a fetched payload
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("payload is empty")]
    Empty,

    #[error("payload has {count} non-blank lines, expected a multiple of {expected}")]
    LineCount { count: usize, expected: usize },

    #[error("element lines malformed near object '{near}'")]
    Malformed { near: String },

    #[error("invalid JSON payload: {0}")]
    Json(String),

    #[error("invalid group name: {0:?}")]
    InvalidGroup(String),
}

/// Error returned by `FreshnessCache::fetch`
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("fetch failed for group '{group}': {source}")]
    Transient {
        group: String,
        #[source]
        source: SourceError,
    },

    #[error("validation failed for group '{group}': {source}")]
    Validation {
        group: String,
        #[source]
        source: ValidationError,
    },

    #[error("cache I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A single object's position could not be sampled
#[derive(Debug, Error, Clone, PartialEq)]
#[error("propagation failed for object {object_id}: {reason}")]
pub struct PropagationError {
    pub object_id: u32,
    pub reason: String,
}

impl PropagationError {
    pub fn new(object_id: u32, reason: impl Into<String>) -> Self {
        Self {
            object_id,
            reason: reason.into(),
        }
    }
}

/// Classifier could not produce a label
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("non-finite feature vector")]
    NonFiniteFeatures,

    #[error("classifier model error: {0}")]
    Model(String),
}
