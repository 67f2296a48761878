#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tag_enforcer_core::{EnforcerCfg, Policy, TagSet, ENVIRONMENT_KEY};
use tag_enforcer_supervisor::{AlertError, AlertSink, ResourceRef, ResourceTagStore, TagEnforcer, TagStoreError};

pub const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:tag-alerts";

/// Collaborator calls in the order they happened, shared between a sink and a store.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub fn calls(log: &CallLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub destination: String,
    pub subject: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<Published>>,
    pub fail: bool,
    pub log: CallLog,
}

impl RecordingSink {
    pub fn logging(log: CallLog) -> Self {
        Self { log, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Published> {
        self.published.lock().unwrap().last().cloned()
    }
}

impl AlertSink for RecordingSink {
    fn publish(&self, destination: &str, subject: &str, message: &str) -> Result<(), AlertError> {
        self.log.lock().unwrap().push("publish");
        self.published.lock().unwrap().push(Published {
            destination: destination.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });
        if self.fail {
            return Err(AlertError::Transport("sns unavailable".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    #[default]
    Stored,
    NoTagSet,
    TransportError,
}

#[derive(Default)]
pub struct MemoryStore {
    pub buckets: Mutex<HashMap<String, TagSet>>,
    pub writes: Mutex<Vec<(ResourceRef, Vec<(String, String)>)>>,
    pub reads: Mutex<Vec<String>>,
    pub read_mode: ReadMode,
    pub fail_writes: bool,
    pub log: CallLog,
}

impl MemoryStore {
    pub fn logging(log: CallLog) -> Self {
        Self { log, ..Self::default() }
    }

    pub fn with_read_mode(read_mode: ReadMode) -> Self {
        Self { read_mode, ..Self::default() }
    }

    pub fn failing_writes() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub fn seed_bucket(&self, name: &str, tags: TagSet) {
        self.buckets.lock().unwrap().insert(name.to_string(), tags);
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    pub fn last_write(&self) -> Option<(ResourceRef, Vec<(String, String)>)> {
        self.writes.lock().unwrap().last().cloned()
    }
}

impl ResourceTagStore for MemoryStore {
    fn write_tags(&self, target: &ResourceRef, tags: &[(String, String)]) -> Result<(), TagStoreError> {
        self.log.lock().unwrap().push("write");
        self.writes.lock().unwrap().push((target.clone(), tags.to_vec()));
        if self.fail_writes {
            return Err(TagStoreError::Transport("AccessDenied".into()));
        }
        if let ResourceRef::StorageBucket(name) = target {
            let replaced: TagSet = tags.iter().cloned().collect();
            self.buckets.lock().unwrap().insert(name.clone(), replaced);
        }
        Ok(())
    }

    fn read_bucket_tags(&self, bucket: &str) -> Result<TagSet, TagStoreError> {
        self.log.lock().unwrap().push("read");
        self.reads.lock().unwrap().push(bucket.to_string());
        match self.read_mode {
            ReadMode::NoTagSet => Err(TagStoreError::NoTagSet),
            ReadMode::TransportError => Err(TagStoreError::Transport("throttled".into())),
            ReadMode::Stored => self
                .buckets
                .lock()
                .unwrap()
                .get(bucket)
                .cloned()
                .ok_or(TagStoreError::NoTagSet),
        }
    }
}

pub fn policy() -> Policy {
    Policy::new(["Owner", "Environment"])
        .with_allowed_values(ENVIRONMENT_KEY, ["prod", "staging", "dev", "sandbox"])
}

pub fn cfg(policy: Policy) -> EnforcerCfg {
    EnforcerCfg {
        policy,
        alert_destination: Some(TOPIC.to_string()),
    }
}

pub fn enforcer(policy: Policy, sink: Arc<RecordingSink>, store: Arc<MemoryStore>) -> TagEnforcer {
    TagEnforcer::new(cfg(policy), Some(sink as Arc<dyn AlertSink>), store as Arc<dyn ResourceTagStore>)
}

pub fn run_instances(ids: &[&str], tags: &[(&str, &str)]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({ "instanceId": id })).collect();
    let tag_items: Vec<Value> = tags.iter().map(|(k, v)| json!({ "key": k, "value": v })).collect();
    json!({
        "version": "0",
        "source": "aws.ec2",
        "detail-type": "AWS API Call via CloudTrail",
        "detail": {
            "eventSource": "ec2.amazonaws.com",
            "eventName": "RunInstances",
            "requestParameters": {
                "tagSpecificationSet": {
                    "items": [
                        { "resourceType": "instance", "tags": { "items": tag_items } }
                    ]
                }
            },
            "responseElements": {
                "instancesSet": { "items": items }
            }
        }
    })
}

pub fn create_bucket(name: Option<&str>) -> Value {
    let mut params = json!({});
    if let Some(name) = name {
        params["bucketName"] = json!(name);
    }
    json!({
        "source": "aws.s3",
        "detail-type": "AWS API Call via CloudTrail",
        "detail": {
            "eventSource": "s3.amazonaws.com",
            "eventName": "CreateBucket",
            "requestParameters": params
        }
    })
}

pub fn tags(pairs: &[(&str, &str)]) -> TagSet {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

pub fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
    p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
