use thiserror::Error;

/// Startup configuration errors. Fatal: no enforcer is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `DEFAULT_TAGS_JSON` could not be parsed.
    #[error("default tags are not valid JSON: {0}")]
    InvalidDefaults(#[source] serde_json::Error),

    /// `DEFAULT_TAGS_JSON` parsed, but is not an object.
    #[error("default tags must be a JSON object, got {0}")]
    DefaultsNotObject(&'static str),

    /// A default value is an array or object.
    #[error("default for tag {key:?} must be a string, number or boolean")]
    NestedDefault { key: String },

    /// A JSON config document could not be parsed.
    #[error("invalid config document: {0}")]
    InvalidDocument(#[source] serde_json::Error),
}
