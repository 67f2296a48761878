#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use tag_enforcer_core::{EnforcerCfg, TagSet};
use tag_enforcer_supervisor::{
    AlertError, AlertSink, ResourceKind, ResourceRef, ResourceTagStore, TagEnforcer, TagStoreError,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// FFI ABI version for tag_enforcer_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const TAG_ENFORCER_FFI_VERSION: u32 = 1;

/// Callback return codes.
pub const TE_OK: i32 = 0;
/// `read_bucket_tags` only: the bucket has no tag set.
pub const TE_NO_TAG_SET: i32 = 1;

#[no_mangle]
pub extern "C" fn tag_enforcer_ffi_version() -> u32 {
    TAG_ENFORCER_FFI_VERSION
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TeStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl TeStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }

    /// Borrow `s` for the duration of one callback.
    fn borrowed(s: &str) -> Self {
        TeStr { ptr: s.as_ptr(), len: s.len() }
    }
}

/// One tag, borrowed for the duration of a callback.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TeTag {
    pub key: TeStr,
    pub value: TeStr,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeResourceKind {
    ComputeInstance = 0,
    StorageBucket = 1,
}

fn kind_to_ffi(k: ResourceKind) -> TeResourceKind {
    match k {
        ResourceKind::ComputeInstance => TeResourceKind::ComputeInstance,
        ResourceKind::StorageBucket => TeResourceKind::StorageBucket,
    }
}

/// Opaque accumulator filled by the host's `read_bucket_tags` via `tag_enforcer_tags_push`.
pub struct TeTagsOut {
    tags: TagSet,
}

pub type TePublishFn = extern "C" fn(ctx: *mut c_void, destination: TeStr, subject: TeStr, message: TeStr) -> i32;

pub type TeWriteTagsFn = extern "C" fn(
    ctx: *mut c_void,
    kind: TeResourceKind,
    ids_ptr: *const TeStr,
    ids_len: usize,
    tags_ptr: *const TeTag,
    tags_len: usize,
) -> i32;

pub type TeReadBucketTagsFn = extern "C" fn(ctx: *mut c_void, bucket: TeStr, out: *mut TeTagsOut) -> i32;

/// Host-provided collaborator callbacks.
///
/// Return `TE_OK` on success and a negative code on transport failure. A null
/// `publish` leaves the alert sink unconfigured.
///
/// The enforcer never spawns threads, but a handle shared across host threads
/// calls these concurrently; `ctx` and the callbacks must tolerate that.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TeHost {
    pub ctx: *mut c_void,
    pub publish: Option<TePublishFn>,
    pub write_tags: Option<TeWriteTagsFn>,
    pub read_bucket_tags: Option<TeReadBucketTagsFn>,
}

struct HostBridge {
    host: TeHost,
}

// SAFETY: thread-safety of `ctx` and the callbacks is part of the `TeHost` contract.
unsafe impl Send for HostBridge {}
unsafe impl Sync for HostBridge {}

impl AlertSink for HostBridge {
    fn publish(&self, destination: &str, subject: &str, message: &str) -> Result<(), AlertError> {
        let Some(cb) = self.host.publish else {
            return Err(AlertError::Transport("no publish callback".into()));
        };
        let rc = cb(
            self.host.ctx,
            TeStr::borrowed(destination),
            TeStr::borrowed(subject),
            TeStr::borrowed(message),
        );
        if rc == TE_OK {
            Ok(())
        } else {
            Err(AlertError::Transport(format!("host publish rc={rc}")))
        }
    }
}

impl ResourceTagStore for HostBridge {
    fn write_tags(&self, target: &ResourceRef, tags: &[(String, String)]) -> Result<(), TagStoreError> {
        let Some(cb) = self.host.write_tags else {
            return Err(TagStoreError::Transport("no write_tags callback".into()));
        };
        let ids: Vec<TeStr> = target.ids().into_iter().map(TeStr::borrowed).collect();
        let tags: Vec<TeTag> = tags
            .iter()
            .map(|(k, v)| TeTag { key: TeStr::borrowed(k), value: TeStr::borrowed(v) })
            .collect();

        let rc = cb(
            self.host.ctx,
            kind_to_ffi(target.kind()),
            ids.as_ptr(),
            ids.len(),
            tags.as_ptr(),
            tags.len(),
        );
        if rc == TE_OK {
            Ok(())
        } else {
            Err(TagStoreError::Transport(format!("host write_tags rc={rc}")))
        }
    }

    fn read_bucket_tags(&self, bucket: &str) -> Result<TagSet, TagStoreError> {
        let Some(cb) = self.host.read_bucket_tags else {
            return Err(TagStoreError::Transport("no read_bucket_tags callback".into()));
        };
        let mut out = TeTagsOut { tags: TagSet::new() };
        match cb(self.host.ctx, TeStr::borrowed(bucket), &mut out as *mut TeTagsOut) {
            TE_OK => Ok(out.tags),
            TE_NO_TAG_SET => Err(TagStoreError::NoTagSet),
            rc => Err(TagStoreError::Transport(format!("host read_bucket_tags rc={rc}"))),
        }
    }
}

/// Opaque handle exposed over FFI.
pub struct TeEnforcer {
    inner: TagEnforcer,
}

/// Acknowledgment; `ok` is always 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeAck {
    pub ok: u8,
}

fn build(cfg: EnforcerCfg, host: TeHost) -> *mut TeEnforcer {
    let bridge = Arc::new(HostBridge { host });
    let sink: Option<Arc<dyn AlertSink>> = if host.publish.is_some() {
        Some(bridge.clone())
    } else {
        None
    };
    let inner = TagEnforcer::new(cfg, sink, bridge);
    Box::into_raw(Box::new(TeEnforcer { inner }))
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns 0 on success, 1 if a global subscriber was already installed.
#[no_mangle]
pub extern "C" fn tag_enforcer_init_logging() -> i32 {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
    {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Create an enforcer configured from the process environment.
///
/// Returns null if the configuration is invalid; the error is logged.
#[no_mangle]
pub extern "C" fn tag_enforcer_new_from_env(host: TeHost) -> *mut TeEnforcer {
    match EnforcerCfg::from_env() {
        Ok(cfg) => build(cfg, host),
        Err(e) => {
            tracing::error!(error = %e, "invalid tag enforcer configuration");
            ptr::null_mut()
        }
    }
}

/// Create an enforcer from a JSON config document.
///
/// Returns null if `cfg_json` is not UTF-8 or the configuration is invalid.
#[no_mangle]
pub unsafe extern "C" fn tag_enforcer_new_from_json(cfg_json: TeStr, host: TeHost) -> *mut TeEnforcer {
    let Some(doc) = cfg_json.as_str() else {
        return ptr::null_mut();
    };
    match EnforcerCfg::from_json(doc) {
        Ok(cfg) => build(cfg, host),
        Err(e) => {
            tracing::error!(error = %e, "invalid tag enforcer configuration");
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn tag_enforcer_free(h: *mut TeEnforcer) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

/// Handle one raw event (UTF-8 JSON). Always acknowledges.
///
/// A null handle or non-UTF-8 input is treated as an unroutable event.
#[no_mangle]
pub unsafe extern "C" fn tag_enforcer_handle(h: *const TeEnforcer, event_json: TeStr) -> TeAck {
    if h.is_null() {
        return TeAck { ok: 1 };
    }
    let handle = &*h;
    let Some(raw) = event_json.as_str() else {
        tracing::debug!("event is not UTF-8; ignoring");
        return TeAck { ok: 1 };
    };
    let ack = handle.inner.handle_json(raw);
    TeAck { ok: ack.ok as u8 }
}

/// Append one tag to a read result. Only valid inside `read_bucket_tags`.
///
/// Records with a null/empty or non-UTF-8 key are dropped; a null value is
/// stored as the empty string. Returns 0 when stored, -1 when dropped.
#[no_mangle]
pub unsafe extern "C" fn tag_enforcer_tags_push(out: *mut TeTagsOut, key: TeStr, value: TeStr) -> i32 {
    if out.is_null() {
        return -1;
    }
    let out = &mut *out;
    let Some(k) = key.as_str().filter(|k| !k.is_empty()) else {
        return -1;
    };
    let v = value.as_str().unwrap_or("");
    out.tags.insert(k, v);
    0
}
