pub mod tags;
pub mod policy;

pub mod evaluate;
pub mod plan;
pub mod cfg;
pub mod error;

pub use tags::{TagSet, normalize, normalize_record, KEY_FIELDS, VALUE_FIELDS};
pub use policy::{Policy, ENVIRONMENT_KEY};

pub use evaluate::{Verdict, evaluate};
pub use plan::{RemediationPlan, plan, layer_defaults, full_replace};
pub use cfg::EnforcerCfg;
pub use error::ConfigError;
