use serde::Serialize;

use crate::{evaluate::Verdict, policy::Policy, tags::TagSet};

/// Tags to write back to a resource. Empty means nothing to write.
///
/// Every entry has a non-empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RemediationPlan {
    pub final_tags: Vec<(String, String)>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.final_tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.final_tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.final_tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn to_tag_set(&self) -> TagSet {
        self.final_tags.iter().cloned().collect()
    }

    fn push(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.final_tags.push((key.to_string(), value.to_string()));
        }
    }
}

/// Per-key merge for a single required key.
///
/// Provided value wins when present and valid; otherwise the policy default,
/// otherwise nothing.
fn merged_value<'a>(key: &str, provided: &'a TagSet, verdict: &Verdict, policy: &'a Policy) -> Option<&'a str> {
    match provided.present(key) {
        Some(v) if !verdict.is_invalid(key) => Some(v),
        _ => policy.default_value(key),
    }
}

/// Compute the tags to write for a non-compliant resource.
///
/// Only keys in `policy.required_keys()` are considered, in policy order, each
/// independently. A compliant verdict yields an empty plan. Keys with neither a
/// usable provided value nor a default are left out.
pub fn plan(provided: &TagSet, verdict: &Verdict, policy: &Policy) -> RemediationPlan {
    let mut out = RemediationPlan::default();
    if verdict.is_compliant() {
        return out;
    }
    for key in policy.required_keys() {
        if let Some(v) = merged_value(key, provided, verdict, policy) {
            out.push(key, v);
        }
    }
    out
}

/// Layer policy defaults underneath `existing` tags.
///
/// Existing non-empty values win. Defaults fill every key that is absent or
/// empty, including defaults for keys the policy does not require.
pub fn layer_defaults(existing: &TagSet, policy: &Policy) -> TagSet {
    let mut merged = existing.clone();
    for (k, v) in policy.default_values() {
        if merged.present(k).is_none() && !v.is_empty() {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

/// Full-replace plan: every non-empty tag in `merged`.
///
/// Required keys come first in policy order, the rest follow in key order.
pub fn full_replace(merged: &TagSet, policy: &Policy) -> RemediationPlan {
    let mut out = RemediationPlan::default();
    for key in policy.required_keys() {
        if let Some(v) = merged.present(key) {
            out.push(key, v);
        }
    }
    for (k, v) in merged {
        if !policy.is_required(k) {
            out.push(k, v);
        }
    }
    out
}
