use super::rules::{IgnoreRule, IgnoreRuleConfig, Rules};
use crate::analysis::references::LivenessPolicy;
use crate::model::types::ServerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file looked up in the analysed root when none is given.
pub const CONFIG_FILE_NAME: &str = ".deadweight.json";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeadweightConfig {
    pub server: ServerConfig,
    /// Extension of the source files to analyse, without the dot
    pub source_extension: String,
    /// Directory names pruned during discovery
    pub excluded_dirs: Vec<String>,
    /// Files ending with this suffix are tests
    pub test_suffix: String,
    /// Names containing this marker are mocks
    pub mock_marker: String,
    pub ignore_embedded_fields: bool,
    pub ignore_rules: Vec<IgnoreRuleConfig>,
}

impl Default for DeadweightConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            source_extension: "go".to_string(),
            excluded_dirs: vec!["vendor".to_string()],
            test_suffix: "_test.go".to_string(),
            mock_marker: "mock".to_string(),
            ignore_embedded_fields: false,
            ignore_rules: Vec::new(),
        }
    }
}

impl DeadweightConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise `<root>/.deadweight.json` is used
    /// when present, and the defaults when it is not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = root.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            },
        };

        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Compile the ignore rules.
    pub fn rules(&self) -> Result<Rules> {
        let ignore_rules = self
            .ignore_rules
            .iter()
            .map(|rule| IgnoreRule::try_from(rule).with_context(|| format!("Invalid ignore rule {:?}", rule.names)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rules::new(ignore_rules, self.ignore_embedded_fields))
    }

    pub fn liveness(&self) -> LivenessPolicy {
        LivenessPolicy::new(&self.test_suffix, &self.mock_marker)
    }
}
