use std::collections::BTreeSet;

use serde::Serialize;

use crate::{policy::Policy, tags::TagSet};

/// Evaluation result: which required keys are missing or carry a disallowed value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Required keys absent or empty, in policy order.
    pub missing_keys: Vec<String>,
    /// Required keys present with a value outside their allowed set.
    pub invalid_value_keys: BTreeSet<String>,
}

impl Verdict {
    pub fn is_compliant(&self) -> bool {
        self.missing_keys.is_empty() && self.invalid_value_keys.is_empty()
    }

    pub fn is_missing(&self, key: &str) -> bool {
        self.missing_keys.iter().any(|k| k == key)
    }

    pub fn is_invalid(&self, key: &str) -> bool {
        self.invalid_value_keys.contains(key)
    }
}

/// Evaluate `tags` against `policy`.
///
/// Pure: no IO, no clock, no randomness. A missing key is never also
/// reported as invalid; value checks only run on present values.
pub fn evaluate(tags: &TagSet, policy: &Policy) -> Verdict {
    let mut verdict = Verdict::default();
    for key in policy.required_keys() {
        match tags.present(key) {
            None => verdict.missing_keys.push(key.clone()),
            Some(value) => {
                if !policy.is_allowed(key, value) {
                    verdict.invalid_value_keys.insert(key.clone());
                }
            }
        }
    }
    verdict
}
