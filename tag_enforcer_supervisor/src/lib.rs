//! tag_enforcer_supervisor
//!
//! Outside-world facing orchestration layer for `tag_enforcer_core`.
//!
//! Responsibilities:
//! - read creation events and route them to a resource adapter
//! - extract canonical tags per resource kind
//! - drive the alert sink and the resource tag store with the core's verdict/plan
//!
//! Non-goals:
//! - no transport (collaborators are traits implemented by the host)
//! - no async
//! - no policy logic (lives in core)

pub mod adapter;
pub mod alert;
pub mod collab;
pub mod dispatch;
pub mod event;

pub use adapter::{
    AdapterCtx,
    AdapterReport,
    BucketAdapter,
    ComputeAdapter,
    ResourceAdapter,
    WriteOutcome,
};

pub use alert::{Alert, AlertOutcome, AlertPublisher};

pub use collab::{
    AlertError,
    AlertSink,
    ResourceKind,
    ResourceRef,
    ResourceTagStore,
    TagStoreError,
};

pub use dispatch::{Ack, IgnoreReason, Outcome, Route, TagEnforcer, route};

pub use event::EventEnvelope;
