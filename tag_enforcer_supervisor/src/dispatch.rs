//! Event dispatcher.
//!
//! Two states per invocation: ROUTE (inspect the envelope, pick an adapter)
//! and DONE. Unroutable events go straight to DONE with no side effects.
//! Every invocation acknowledges `{ "ok": true }`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tag_enforcer_core::{EnforcerCfg, Policy};

use crate::adapter::{AdapterCtx, AdapterReport, BucketAdapter, ComputeAdapter, ResourceAdapter};
use crate::alert::AlertPublisher;
use crate::collab::{AlertSink, ResourceTagStore};
use crate::event::{EventEnvelope, CLOUDTRAIL_ENVELOPE, CREATE_BUCKET, RUN_INSTANCES};

/// Acknowledgment returned to the event transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not a JSON document.
    Unparsable,
    /// Valid JSON, but not an object.
    NotAnEnvelope,
    /// `detail-type` absent or not the recognized envelope kind.
    EnvelopeKind,
    MissingDetail,
    EventName,
}

/// Result of the ROUTE state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Compute,
    Bucket,
    Ignored(IgnoreReason),
}

/// What one invocation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub route: Route,
    /// `None` when the event was ignored.
    pub report: Option<AdapterReport>,
}

impl Outcome {
    fn ignored(reason: IgnoreReason) -> Self {
        Self {
            route: Route::Ignored(reason),
            report: None,
        }
    }

    pub fn ack(&self) -> Ack {
        Ack::OK
    }
}

/// Select an adapter for `envelope`.
pub fn route(envelope: &EventEnvelope) -> Route {
    if envelope.detail_type.as_deref() != Some(CLOUDTRAIL_ENVELOPE) {
        return Route::Ignored(IgnoreReason::EnvelopeKind);
    }
    if !envelope.has_detail() {
        return Route::Ignored(IgnoreReason::MissingDetail);
    }
    match envelope.event_name() {
        Some(RUN_INSTANCES) => Route::Compute,
        Some(CREATE_BUCKET) => Route::Bucket,
        _ => Route::Ignored(IgnoreReason::EventName),
    }
}

/// Routes creation events to resource adapters.
///
/// Holds only the immutable policy and the collaborator handles, so one
/// instance can serve concurrent invocations behind an `Arc`.
pub struct TagEnforcer {
    policy: Arc<Policy>,
    alerts: AlertPublisher,
    store: Arc<dyn ResourceTagStore>,
    compute: ComputeAdapter,
    bucket: BucketAdapter,
}

impl TagEnforcer {
    pub fn new(cfg: EnforcerCfg, sink: Option<Arc<dyn AlertSink>>, store: Arc<dyn ResourceTagStore>) -> Self {
        Self {
            policy: Arc::new(cfg.policy),
            alerts: AlertPublisher::new(sink, cfg.alert_destination),
            store,
            compute: ComputeAdapter,
            bucket: BucketAdapter,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn alerts(&self) -> &AlertPublisher {
        &self.alerts
    }

    /// Run one event through ROUTE and, if routable, its adapter.
    pub fn dispatch(&self, event: &Value) -> Outcome {
        if !event.is_object() {
            tracing::debug!("event is not a JSON object; ignoring");
            return Outcome::ignored(IgnoreReason::NotAnEnvelope);
        }
        let envelope = EventEnvelope::from_value(event);
        let route = route(&envelope);

        tracing::info!(
            detail_type = envelope.detail_type.as_deref().unwrap_or(""),
            source = envelope.source.as_deref().unwrap_or(""),
            event_name = envelope.event_name().unwrap_or(""),
            route = ?route,
            "received event"
        );

        let adapter: &dyn ResourceAdapter = match route {
            Route::Compute => &self.compute,
            Route::Bucket => &self.bucket,
            Route::Ignored(reason) => {
                tracing::debug!(reason = ?reason, "event ignored");
                return Outcome::ignored(reason);
            }
        };

        let ctx = AdapterCtx {
            policy: &self.policy,
            alerts: &self.alerts,
            store: self.store.as_ref(),
        };
        let report = adapter.handle(&envelope.detail, &ctx);

        tracing::info!(
            kind = %adapter.kind(),
            compliant = report.verdict.is_compliant(),
            alert = ?report.alert,
            write = ?report.write,
            "event handled"
        );

        Outcome {
            route,
            report: Some(report),
        }
    }

    /// Handle one event. Always acknowledges success.
    pub fn handle(&self, event: &Value) -> Ack {
        self.dispatch(event).ack()
    }

    /// Handle one raw JSON event. Unparsable input is ignored.
    pub fn handle_json(&self, raw: &str) -> Ack {
        self.dispatch_json(raw).ack()
    }

    pub fn dispatch_json(&self, raw: &str) -> Outcome {
        match serde_json::from_str::<Value>(raw) {
            Ok(event) => self.dispatch(&event),
            Err(e) => {
                tracing::debug!(error = %e, "event is not valid JSON; ignoring");
                Outcome::ignored(IgnoreReason::Unparsable)
            }
        }
    }
}
