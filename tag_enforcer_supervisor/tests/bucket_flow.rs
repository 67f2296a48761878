mod common;

use std::sync::Arc;

use common::*;
use tag_enforcer_supervisor::*;

fn defaults_policy() -> tag_enforcer_core::Policy {
    policy()
        .with_default("Owner", "platform-team")
        .with_default("Environment", "sandbox")
}

#[test]
fn untagged_bucket_gets_full_default_set() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::with_read_mode(ReadMode::NoTagSet));
    let enf = enforcer(defaults_policy(), sink.clone(), store.clone());

    let report = enf.dispatch(&create_bucket(Some("logs-bucket"))).report.unwrap();

    assert_eq!(store.read_count(), 1);
    let (target, written) = store.last_write().expect("write");
    assert_eq!(target, ResourceRef::StorageBucket("logs-bucket".into()));
    assert_eq!(written, pairs(&[("Owner", "platform-team"), ("Environment", "sandbox")]));
    assert!(report.verdict.is_compliant());
    assert_eq!(report.alert, AlertOutcome::NotNeeded);
    assert_eq!(sink.count(), 0);
}

#[test]
fn existing_tags_win_and_are_kept_in_full_replace() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::default());
    store.seed_bucket("data", tags(&[("Owner", "carol"), ("Project", "atlas")]));
    let enf = enforcer(defaults_policy(), sink.clone(), store.clone());

    enf.handle(&create_bucket(Some("data")));

    let (_, written) = store.last_write().unwrap();
    assert_eq!(
        written,
        pairs(&[("Owner", "carol"), ("Environment", "sandbox"), ("Project", "atlas")])
    );
    assert_eq!(sink.count(), 0);
}

#[test]
fn generic_read_failure_is_treated_as_untagged() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::with_read_mode(ReadMode::TransportError));
    let enf = enforcer(defaults_policy(), sink.clone(), store.clone());

    let outcome = enf.dispatch(&create_bucket(Some("b1")));

    assert_eq!(outcome.ack(), Ack::OK);
    let report = outcome.report.unwrap();
    assert_eq!(report.write, WriteOutcome::Applied);
    assert_eq!(store.write_count(), 1);
    assert_eq!(sink.count(), 0);
}

#[test]
fn uncovered_required_key_alerts_with_missing_keys() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::with_read_mode(ReadMode::NoTagSet));
    let p = tag_enforcer_core::Policy::new(["Owner", "CostCenter"]).with_default("Owner", "platform-team");
    let enf = enforcer(p, sink.clone(), store.clone());

    let report = enf.dispatch(&create_bucket(Some("b2"))).report.unwrap();

    assert_eq!(report.verdict.missing_keys, vec!["CostCenter".to_string()]);
    assert_eq!(store.last_write().unwrap().1, pairs(&[("Owner", "platform-team")]));
    let alert = sink.last().expect("alert");
    assert_eq!(alert.subject, alert::BUCKET_SUBJECT);
    assert_eq!(alert.message, r#"Bucket: b2, missing: ["CostCenter"]"#);
}

#[test]
fn invalid_values_are_not_checked_for_buckets() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::default());
    store.seed_bucket("b3", tags(&[("Owner", "dave"), ("Environment", "qa")]));
    let enf = enforcer(policy(), sink.clone(), store.clone());

    let report = enf.dispatch(&create_bucket(Some("b3"))).report.unwrap();

    assert!(report.verdict.invalid_value_keys.is_empty());
    assert_eq!(sink.count(), 0);
}

#[test]
fn nothing_to_write_skips_write_and_alerts() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::with_read_mode(ReadMode::NoTagSet));
    let enf = enforcer(policy(), sink.clone(), store.clone());

    let report = enf.dispatch(&create_bucket(Some("bare"))).report.unwrap();

    assert!(report.plan.is_empty());
    assert_eq!(report.write, WriteOutcome::Skipped);
    assert_eq!(store.write_count(), 0);
    assert_eq!(sink.count(), 1);
}

#[test]
fn write_failure_is_swallowed() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::failing_writes());
    let enf = enforcer(defaults_policy(), sink.clone(), store.clone());

    let outcome = enf.dispatch(&create_bucket(Some("b4")));
    assert_eq!(outcome.report.as_ref().unwrap().write, WriteOutcome::Failed);
    assert_eq!(outcome.ack(), Ack::OK);
}

#[test]
fn missing_bucket_name_is_a_noop() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::default());
    let enf = enforcer(defaults_policy(), sink.clone(), store.clone());

    let outcome = enf.dispatch(&create_bucket(None));

    assert_eq!(outcome.route, Route::Bucket);
    assert_eq!(outcome.report.unwrap().resource, None);
    assert_eq!(store.read_count(), 0);
    assert_eq!(store.write_count(), 0);
    assert_eq!(sink.count(), 0);
}

#[test]
fn bucket_is_read_then_written_then_alerted() {
    let log = CallLog::default();
    let sink = Arc::new(RecordingSink::logging(log.clone()));
    let store = Arc::new(MemoryStore::logging(log.clone()));
    let enf = enforcer(policy().with_default("Owner", "platform-team"), sink, store);

    enf.handle(&create_bucket(Some("assets")));

    assert_eq!(calls(&log), ["read", "write", "publish"]);
}
