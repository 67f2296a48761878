//! External collaborators: the alert transport and the resource tagging API.
//!
//! Implementations live with the host (cloud SDK clients, FFI callbacks,
//! in-memory fakes). Every call is made at most once per invocation and its
//! error is handled at the call site.

use std::fmt;

use serde::Serialize;
use tag_enforcer_core::TagSet;
use thiserror::Error;

/// Resource kinds with an extraction adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ComputeInstance,
    StorageBucket,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::ComputeInstance => "compute-instance",
            ResourceKind::StorageBucket => "storage-bucket",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, kind-specific resource identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ResourceRef {
    ComputeInstances(Vec<String>),
    StorageBucket(String),
}

impl ResourceRef {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::ComputeInstances(_) => ResourceKind::ComputeInstance,
            ResourceRef::StorageBucket(_) => ResourceKind::StorageBucket,
        }
    }

    /// Identifiers addressed by this reference.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            ResourceRef::ComputeInstances(ids) => ids.iter().map(String::as_str).collect(),
            ResourceRef::StorageBucket(name) => vec![name.as_str()],
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert publish failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagStoreError {
    /// The resource exists but carries no tags at all.
    #[error("no tag set")]
    NoTagSet,

    #[error("tag store transport failure: {0}")]
    Transport(String),
}

/// Delivers human-readable non-compliance notifications.
pub trait AlertSink: Send + Sync {
    /// Publish one alert to `destination`. Subject and message arrive
    /// already truncated to the transport limits.
    fn publish(&self, destination: &str, subject: &str, message: &str) -> Result<(), AlertError>;
}

/// Reads and writes resource tags.
pub trait ResourceTagStore: Send + Sync {
    /// Write `tags` to every resource in `target`.
    ///
    /// For storage buckets this replaces the whole tag set.
    fn write_tags(&self, target: &ResourceRef, tags: &[(String, String)]) -> Result<(), TagStoreError>;

    /// Current tags of a bucket. `Err(TagStoreError::NoTagSet)` when it has none.
    fn read_bucket_tags(&self, bucket: &str) -> Result<TagSet, TagStoreError>;
}
