//! Configuration file handling and symbol ignore rules.

pub mod json_config;
pub mod rules;

pub use json_config::{DeadweightConfig, CONFIG_FILE_NAME};
pub use rules::{IgnoreRule, IgnoreRuleConfig, Rules};
