use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// The well-known classification key whose values may be constrained.
pub const ENVIRONMENT_KEY: &str = "Environment";

/// Declarative tagging contract: required keys, allowed values, defaults.
///
/// Built once at startup and shared read-only by every invocation; there are
/// no mutating methods after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    required_keys: Vec<String>,
    allowed_values: BTreeMap<String, BTreeSet<String>>,
    default_values: BTreeMap<String, String>,
}

impl Policy {
    /// Create a policy requiring `required_keys`, in the given order.
    ///
    /// Duplicate keys keep their first position.
    pub fn new<I, S>(required_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        for k in required_keys {
            let k = k.into();
            if seen.insert(k.clone()) {
                keys.push(k);
            }
        }
        Self {
            required_keys: keys,
            allowed_values: BTreeMap::new(),
            default_values: BTreeMap::new(),
        }
    }

    /// Constrain `key` to `values`. An empty set leaves the key unconstrained.
    pub fn with_allowed_values<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            self.allowed_values.remove(&key);
        } else {
            self.allowed_values.insert(key, set);
        }
        self
    }

    /// Set the default value for `key`.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_values.insert(key.into(), value.into());
        self
    }

    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in defaults {
            self.default_values.insert(k.into(), v.into());
        }
        self
    }

    pub fn required_keys(&self) -> &[String] {
        &self.required_keys
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required_keys.iter().any(|k| k == key)
    }

    /// Allowed values for `key`, or `None` when any value is accepted.
    pub fn allowed_values(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.allowed_values.get(key)
    }

    pub fn is_allowed(&self, key: &str, value: &str) -> bool {
        self.allowed_values(key).map_or(true, |set| set.contains(value))
    }

    /// Configured default for `key`, ignoring empty defaults.
    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.default_values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// All configured defaults, including ones for keys that are not required.
    pub fn default_values(&self) -> &BTreeMap<String, String> {
        &self.default_values
    }
}
