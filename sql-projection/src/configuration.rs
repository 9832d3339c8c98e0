//! Projection configuration.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// What to do when two selections produce different expressions under the same response key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateFields {
    /// Log a warning and keep the last expression.
    #[default]
    Warn,
    /// Fail the resolution pass.
    Reject,
}

/// Projection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Fail instead of projecting the whole row when no resolve info is supplied.
    pub require_resolve_info: bool,

    /// Fail when an argument references a variable missing from the variable table.
    /// When disabled the argument is treated as absent.
    pub strict_variables: bool,

    /// Handling of conflicting expressions selected under the same response key.
    pub duplicate_fields: DuplicateFields,

    /// Maximum nesting of fragments inside a selection set.
    pub recursion_limit: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            require_resolve_info: false,
            strict_variables: false,
            duplicate_fields: DuplicateFields::default(),
            recursion_limit: default_recursion_limit(),
        }
    }
}

fn default_recursion_limit() -> usize {
    // Well above what a legitimate query nests, well below a stack overflow.
    512
}

impl FromStr for Configuration {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s)
    }
}

/// The JSON schema of [`Configuration`], for editor support of configuration files.
pub fn generate_config_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Configuration)
}
