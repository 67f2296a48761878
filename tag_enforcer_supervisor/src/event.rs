//! Inbound event model.
//!
//! Field access is lenient: any missing or mistyped node reads as empty,
//! never as an error.

use serde_json::Value;

/// The only envelope kind the enforcer routes.
pub const CLOUDTRAIL_ENVELOPE: &str = "AWS API Call via CloudTrail";

pub const RUN_INSTANCES: &str = "RunInstances";
pub const CREATE_BUCKET: &str = "CreateBucket";

/// One delivered event: `{ "detail-type", "source", "detail": { "eventName", ... } }`.
#[derive(Clone, Debug, Default)]
pub struct EventEnvelope {
    pub detail_type: Option<String>,
    pub source: Option<String>,
    pub detail: Value,
}

impl EventEnvelope {
    /// Read an envelope out of a raw JSON value, one field at a time.
    ///
    /// A mistyped field reads as absent without affecting the others.
    pub fn from_value(raw: &Value) -> Self {
        let text = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            detail_type: text("detail-type"),
            source: text("source"),
            detail: raw.get("detail").cloned().unwrap_or(Value::Null),
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        self.detail.get("eventName").and_then(Value::as_str)
    }

    pub fn has_detail(&self) -> bool {
        self.detail.as_object().map_or(false, |o| !o.is_empty())
    }
}

fn array_at<'a>(v: &'a Value, pointer: &str) -> &'a [Value] {
    v.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Newly created instance ids from a `RunInstances` detail, first occurrence order.
pub fn instance_ids(detail: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in array_at(detail, "/responseElements/instancesSet/items") {
        if let Some(id) = item.get("instanceId").and_then(Value::as_str) {
            if !id.is_empty() && !out.iter().any(|seen| seen == id) {
                out.push(id.to_string());
            }
        }
    }
    out
}

/// Raw tag records from every tag specification in a `RunInstances` request.
pub fn requested_tag_records(detail: &Value) -> Vec<&Value> {
    array_at(detail, "/requestParameters/tagSpecificationSet/items")
        .iter()
        .flat_map(|spec| array_at(spec, "/tags/items"))
        .collect()
}

/// Bucket name from a `CreateBucket` detail.
pub fn bucket_name(detail: &Value) -> Option<&str> {
    detail
        .pointer("/requestParameters/bucketName")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}
