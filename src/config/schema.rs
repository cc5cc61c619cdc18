//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use crate::lineage::{DEFAULT_MAX_DEPTH, RelationRule};
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Always display `Kind.group/name`
    #[serde(default = "default_false")]
    pub show_group: bool,

    /// Maximum lineage depth below the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Default output format
    #[serde(default)]
    pub output: OutputFormat,

    /// Omit the table header row
    #[serde(default = "default_false")]
    pub no_headers: bool,

    /// Resolve the built-in Pod, Service, Ingress, storage and RBAC relations
    #[serde(default = "default_true")]
    pub builtin_rules: bool,

    /// Extra relation rules, applied after the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationRule>,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_group: default_false(),
            max_depth: default_max_depth(),
            output: OutputFormat::default(),
            no_headers: default_false(),
            builtin_rules: default_true(),
            relations: Vec::new(),
        }
    }
}
