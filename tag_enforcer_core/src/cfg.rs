use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::policy::{Policy, ENVIRONMENT_KEY};

pub const ENV_REQUIRED_TAG_KEYS: &str = "REQUIRED_TAG_KEYS";
pub const ENV_DEFAULT_TAGS_JSON: &str = "DEFAULT_TAGS_JSON";
pub const ENV_ALLOWED_ENV_VALUES: &str = "ALLOWED_ENV_VALUES";
pub const ENV_ALERTS_TOPIC_ARN: &str = "ALERTS_TOPIC_ARN";

pub const DEFAULT_REQUIRED_TAG_KEYS: &str = "Owner,Environment";
pub const DEFAULT_ALLOWED_ENV_VALUES: &str = "prod,staging,dev,sandbox";

/// Process-wide enforcer configuration, read once at startup.
///
/// Deserializes from the same document shape as [`EnforcerCfg::from_json`].
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "CfgDoc")]
pub struct EnforcerCfg {
    pub policy: Policy,
    /// Alert sink destination (topic ARN). `None` means alerts are skipped.
    pub alert_destination: Option<String>,
}

impl Default for EnforcerCfg {
    fn default() -> Self {
        Self {
            policy: build_policy(
                split_list(DEFAULT_REQUIRED_TAG_KEYS),
                BTreeMap::new(),
                split_list(DEFAULT_ALLOWED_ENV_VALUES),
            ),
            alert_destination: None,
        }
    }
}

/// Serialized form of [`EnforcerCfg`]; absent fields take the environment defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CfgDoc {
    #[serde(default = "doc_required_keys")]
    required_tag_keys: Vec<String>,
    #[serde(default)]
    default_tags: Map<String, Value>,
    #[serde(default = "doc_allowed_env")]
    allowed_env_values: Vec<String>,
    #[serde(default)]
    alerts_topic_arn: Option<String>,
}

fn doc_required_keys() -> Vec<String> {
    split_list(DEFAULT_REQUIRED_TAG_KEYS)
}

fn doc_allowed_env() -> Vec<String> {
    split_list(DEFAULT_ALLOWED_ENV_VALUES)
}

impl EnforcerCfg {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// Unset variables take their defaults; a variable set to the empty string
    /// is honored as empty (e.g. no required keys).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = split_list(
            &lookup(ENV_REQUIRED_TAG_KEYS).unwrap_or_else(|| DEFAULT_REQUIRED_TAG_KEYS.to_string()),
        );
        let allowed = split_list(
            &lookup(ENV_ALLOWED_ENV_VALUES).unwrap_or_else(|| DEFAULT_ALLOWED_ENV_VALUES.to_string()),
        );
        let defaults = parse_defaults(&lookup(ENV_DEFAULT_TAGS_JSON).unwrap_or_default())?;

        Ok(Self {
            policy: build_policy(required, defaults, allowed),
            alert_destination: non_empty(lookup(ENV_ALERTS_TOPIC_ARN)),
        })
    }

    /// Load from a JSON config document.
    ///
    /// Fields: `required_tag_keys`, `default_tags`, `allowed_env_values`,
    /// `alerts_topic_arn`. Absent fields take the same defaults as the
    /// environment loader.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let doc: CfgDoc = serde_json::from_str(doc).map_err(ConfigError::InvalidDocument)?;
        Self::try_from(doc)
    }
}

impl TryFrom<CfgDoc> for EnforcerCfg {
    type Error = ConfigError;

    fn try_from(doc: CfgDoc) -> Result<Self, Self::Error> {
        let required = doc.required_tag_keys.iter().flat_map(|k| split_list(k)).collect();
        let allowed = doc.allowed_env_values.iter().flat_map(|v| split_list(v)).collect();
        let defaults = defaults_from_map(doc.default_tags)?;

        Ok(Self {
            policy: build_policy(required, defaults, allowed),
            alert_destination: non_empty(doc.alerts_topic_arn),
        })
    }
}

fn build_policy(required: Vec<String>, defaults: BTreeMap<String, String>, allowed_env: Vec<String>) -> Policy {
    Policy::new(required)
        .with_allowed_values(ENVIRONMENT_KEY, allowed_env)
        .with_defaults(defaults)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Comma-separated list, items trimmed, empty items dropped.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `DEFAULT_TAGS_JSON`. Blank input means no defaults.
pub fn parse_defaults(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let value: Value = serde_json::from_str(raw).map_err(ConfigError::InvalidDefaults)?;
    match value {
        Value::Object(map) => defaults_from_map(map),
        Value::Null => Err(ConfigError::DefaultsNotObject("null")),
        Value::Bool(_) => Err(ConfigError::DefaultsNotObject("boolean")),
        Value::Number(_) => Err(ConfigError::DefaultsNotObject("number")),
        Value::String(_) => Err(ConfigError::DefaultsNotObject("string")),
        Value::Array(_) => Err(ConfigError::DefaultsNotObject("array")),
    }
}

fn defaults_from_map(map: Map<String, Value>) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let text = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => return Err(ConfigError::NestedDefault { key }),
        };
        out.insert(key, text);
    }
    Ok(out)
}
