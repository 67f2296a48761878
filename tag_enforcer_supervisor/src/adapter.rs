//! Resource adapters: map one event shape onto the evaluate/plan pipeline and
//! drive the collaborators with the result.
//!
//! Each adapter makes at most one read and one write per invocation. A failed
//! collaborator call is logged and the remaining steps still run.

use serde_json::Value;
use tag_enforcer_core::{
    evaluate, full_replace, layer_defaults, normalize, plan, Policy, RemediationPlan, TagSet, Verdict,
};

use crate::alert::{Alert, AlertOutcome, AlertPublisher};
use crate::collab::{ResourceKind, ResourceRef, ResourceTagStore, TagStoreError};
use crate::event::{bucket_name, instance_ids, requested_tag_records};

/// Borrowed collaborators and policy for one invocation.
pub struct AdapterCtx<'a> {
    pub policy: &'a Policy,
    pub alerts: &'a AlertPublisher,
    pub store: &'a dyn ResourceTagStore,
}

/// What happened to the tag write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to write, or nothing to write to.
    #[default]
    Skipped,
    Applied,
    Failed,
}

/// Per-invocation record of an adapter run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterReport {
    pub resource: Option<ResourceRef>,
    pub provided: TagSet,
    pub verdict: Verdict,
    pub plan: RemediationPlan,
    pub alert: AlertOutcome,
    pub write: WriteOutcome,
}

impl AdapterReport {
    fn noop() -> Self {
        Self {
            resource: None,
            provided: TagSet::new(),
            verdict: Verdict::default(),
            plan: RemediationPlan::default(),
            alert: AlertOutcome::NotNeeded,
            write: WriteOutcome::Skipped,
        }
    }
}

/// Trait: handle the `detail` record of one creation event.
pub trait ResourceAdapter {
    fn kind(&self) -> ResourceKind;

    fn handle(&self, detail: &Value, ctx: &AdapterCtx<'_>) -> AdapterReport;
}

fn write_plan(store: &dyn ResourceTagStore, target: &ResourceRef, plan: &RemediationPlan) -> WriteOutcome {
    match store.write_tags(target, &plan.final_tags) {
        Ok(()) => {
            tracing::info!(
                kind = %target.kind(),
                resources = ?target.ids(),
                tags = ?plan.final_tags,
                "applied tags"
            );
            WriteOutcome::Applied
        }
        Err(e) => {
            tracing::warn!(kind = %target.kind(), resources = ?target.ids(), error = %e, "tag write failed");
            WriteOutcome::Failed
        }
    }
}

/// `RunInstances`: alert on any non-compliance, then patch the governed keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputeAdapter;

impl ResourceAdapter for ComputeAdapter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ComputeInstance
    }

    fn handle(&self, detail: &Value, ctx: &AdapterCtx<'_>) -> AdapterReport {
        let ids = instance_ids(detail);
        let provided = normalize(requested_tag_records(detail));
        let verdict = evaluate(&provided, ctx.policy);

        // Alerting precedes the write and does not depend on it.
        let alert = if verdict.is_compliant() {
            AlertOutcome::NotNeeded
        } else {
            ctx.alerts.publish(&Alert::compute(&verdict, &ids, &provided))
        };

        let remediation = plan(&provided, &verdict, ctx.policy);
        let write = if ids.is_empty() || remediation.is_empty() {
            WriteOutcome::Skipped
        } else {
            write_plan(ctx.store, &ResourceRef::ComputeInstances(ids.clone()), &remediation)
        };

        AdapterReport {
            resource: Some(ResourceRef::ComputeInstances(ids)),
            provided,
            verdict,
            plan: remediation,
            alert,
            write,
        }
    }
}

/// `CreateBucket`: layer defaults under the current tags, write the full set
/// back, alert on whatever is still missing.
///
/// Only missing keys are checked here; allowed-value constraints do not apply.
#[derive(Clone, Copy, Debug, Default)]
pub struct BucketAdapter;

impl BucketAdapter {
    fn read_existing(store: &dyn ResourceTagStore, bucket: &str) -> TagSet {
        match store.read_bucket_tags(bucket) {
            Ok(tags) => tags,
            Err(TagStoreError::NoTagSet) => TagSet::new(),
            Err(e) => {
                tracing::debug!(bucket = %bucket, error = %e, "bucket tag read failed; treating as untagged");
                TagSet::new()
            }
        }
    }
}

impl ResourceAdapter for BucketAdapter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::StorageBucket
    }

    fn handle(&self, detail: &Value, ctx: &AdapterCtx<'_>) -> AdapterReport {
        let Some(bucket) = bucket_name(detail) else {
            tracing::debug!("CreateBucket event without bucket name; ignoring");
            return AdapterReport::noop();
        };

        let existing = Self::read_existing(ctx.store, bucket);
        let merged = layer_defaults(&existing, ctx.policy);
        let remediation = full_replace(&merged, ctx.policy);
        let target = ResourceRef::StorageBucket(bucket.to_string());

        let write = if remediation.is_empty() {
            WriteOutcome::Skipped
        } else {
            write_plan(ctx.store, &target, &remediation)
        };

        let verdict = Verdict {
            missing_keys: evaluate(&merged, ctx.policy).missing_keys,
            ..Verdict::default()
        };
        let alert = if verdict.missing_keys.is_empty() {
            AlertOutcome::NotNeeded
        } else {
            ctx.alerts.publish(&Alert::bucket(bucket, &verdict.missing_keys))
        };

        AdapterReport {
            resource: Some(target),
            provided: merged,
            verdict,
            plan: remediation,
            alert,
            write,
        }
    }
}
