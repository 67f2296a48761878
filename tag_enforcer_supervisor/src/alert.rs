use std::sync::Arc;

use serde_json::json;
use tag_enforcer_core::{TagSet, Verdict};

use crate::collab::AlertSink;

/// Transport limit on alert subjects, in characters.
pub const MAX_SUBJECT_CHARS: usize = 100;
/// Transport limit on alert bodies, in characters.
pub const MAX_MESSAGE_CHARS: usize = 30_000;

pub const COMPUTE_SUBJECT: &str = "Tag enforcer: EC2 RunInstances tags issue";
pub const BUCKET_SUBJECT: &str = "Tag enforcer: S3 CreateBucket tags missing";

/// A rendered alert, before truncation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub message: String,
}

impl Alert {
    /// Compute alert: JSON body with missing keys, invalid keys, ids and provided tags.
    pub fn compute(verdict: &Verdict, ids: &[String], provided: &TagSet) -> Self {
        let body = json!({
            "missing": verdict.missing_keys,
            "invalid": verdict.invalid_value_keys,
            "ids": ids,
            "provided": provided,
        });
        Self {
            subject: COMPUTE_SUBJECT.to_string(),
            message: body.to_string(),
        }
    }

    pub fn bucket(bucket: &str, missing: &[String]) -> Self {
        Self {
            subject: BUCKET_SUBJECT.to_string(),
            message: format!("Bucket: {bucket}, missing: {missing:?}"),
        }
    }
}

/// Result of one publish attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The resource was compliant; nothing to say.
    NotNeeded,
    Published,
    /// No sink or destination configured.
    Skipped,
    Failed,
}

impl AlertOutcome {
    /// An alert was raised, whether or not the transport delivered it.
    pub fn raised(self) -> bool {
        !matches!(self, AlertOutcome::NotNeeded)
    }
}

/// Truncate to at most `max` chars, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Best-effort alert delivery. Never propagates a failure.
#[derive(Clone, Default)]
pub struct AlertPublisher {
    sink: Option<Arc<dyn AlertSink>>,
    destination: Option<String>,
}

impl std::fmt::Debug for AlertPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPublisher")
            .field("sink", &self.sink.is_some())
            .field("destination", &self.destination)
            .finish()
    }
}

impl AlertPublisher {
    pub fn new(sink: Option<Arc<dyn AlertSink>>, destination: Option<String>) -> Self {
        Self { sink, destination }
    }

    pub fn is_configured(&self) -> bool {
        self.sink.is_some() && self.destination.is_some()
    }

    pub fn publish(&self, alert: &Alert) -> AlertOutcome {
        let (sink, destination) = match (&self.sink, &self.destination) {
            (Some(sink), Some(dest)) => (sink, dest),
            _ => {
                tracing::warn!(subject = %alert.subject, "alert sink not configured; skipping alert");
                return AlertOutcome::Skipped;
            }
        };

        let subject = truncate_chars(&alert.subject, MAX_SUBJECT_CHARS);
        let message = truncate_chars(&alert.message, MAX_MESSAGE_CHARS);

        match sink.publish(destination, subject, message) {
            Ok(()) => {
                tracing::info!(destination = %destination, subject = %subject, "alert published");
                AlertOutcome::Published
            }
            Err(e) => {
                tracing::warn!(destination = %destination, error = %e, "alert publish failed");
                AlertOutcome::Failed
            }
        }
    }
}
