use crate::model::{Kind, Symbol};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ignore rule as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IgnoreRuleConfig {
    pub kinds: Vec<Kind>,
    pub names: Vec<String>,
}

/// Excludes symbols of the given kinds whose name matches any glob.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    kinds: HashSet<Kind>,
    names: GlobSet,
}

impl IgnoreRule {
    pub fn new<I, S>(kinds: impl IntoIterator<Item = Kind>, names: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in names {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(Self {
            kinds: kinds.into_iter().collect(),
            names: builder.build()?,
        })
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        self.kinds.contains(&symbol.kind) && self.names.is_match(&symbol.name)
    }
}

impl TryFrom<&IgnoreRuleConfig> for IgnoreRule {
    type Error = globset::Error;

    fn try_from(config: &IgnoreRuleConfig) -> Result<Self, Self::Error> {
        Self::new(config.kinds.iter().copied(), &config.names)
    }
}

/// Ordered ignore rules plus the embedded-field switch.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub ignore_rules: Vec<IgnoreRule>,
    pub ignore_embedded_fields: bool,
}

impl Rules {
    pub fn new(ignore_rules: Vec<IgnoreRule>, ignore_embedded_fields: bool) -> Self {
        Self {
            ignore_rules,
            ignore_embedded_fields,
        }
    }

    /// A symbol is kept unless it is an embedded field while those are ignored,
    /// or some rule matches it.
    pub fn keep_symbol(&self, symbol: &Symbol) -> bool {
        if symbol.is_embedded_field && self.ignore_embedded_fields {
            return false;
        }
        !self.ignore_rules.iter().any(|rule| rule.matches(symbol))
    }
}
