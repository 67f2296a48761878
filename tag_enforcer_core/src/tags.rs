use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepted field names for a tag record's key, in lookup order.
///
/// Event producers disagree on casing: CloudTrail request parameters use
/// `key`/`value`, the bucket tagging API uses `Key`/`Value`.
pub const KEY_FIELDS: [&str; 2] = ["Key", "key"];

/// Accepted field names for a tag record's value, in lookup order.
pub const VALUE_FIELDS: [&str; 2] = ["Value", "value"];

/// Canonical key -> value mapping of a resource's tags.
///
/// Keys are case-sensitive. A missing key and an empty value are both
/// "absent" as far as evaluation is concerned; see [`TagSet::present`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a tag. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(key.into(), value.into())
    }

    /// Raw lookup, empty values included.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Lookup that treats an empty value as absent.
    pub fn present(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.tags.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = TagSet::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

#[inline]
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First field from `names` holding a non-null, non-empty value.
///
/// Falls back to an empty string when a field exists but every candidate is
/// empty, so `{"Key": ""}` is distinguishable from a record without a key.
fn pick_field(record: &serde_json::Map<String, Value>, names: &[&str]) -> Option<String> {
    let mut empty_seen = false;
    for name in names {
        match record.get(*name).and_then(scalar_text) {
            Some(s) if !s.is_empty() => return Some(s),
            Some(_) => empty_seen = true,
            None => {}
        }
    }
    if empty_seen {
        Some(String::new())
    } else {
        None
    }
}

/// Convert one raw tag record into a `(key, value)` pair.
///
/// Returns `None` for non-object records and for records whose key is
/// null, absent, or empty. A present key with a null or absent value yields
/// an empty-string value.
pub fn normalize_record(raw: &Value) -> Option<(String, String)> {
    let record = raw.as_object()?;
    let key = pick_field(record, &KEY_FIELDS).filter(|k| !k.is_empty())?;
    let value = pick_field(record, &VALUE_FIELDS).unwrap_or_default();
    Some((key, value))
}

/// Normalize a sequence of raw tag records into a [`TagSet`].
///
/// Malformed records are dropped silently. Later records win on duplicate keys.
pub fn normalize<'a, I>(raw: I) -> TagSet
where
    I: IntoIterator<Item = &'a Value>,
{
    raw.into_iter().filter_map(normalize_record).collect()
}
