//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{paths, schema::Config};
use crate::lineage::RelationRule;
use anyhow::{Context, Result};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Root config
    /// 3. Built-in defaults
    ///
    /// Command-line flags are applied on top by the caller.
    pub fn load() -> Result<Config> {
        Self::load_layers(&paths::root_config_path())
    }

    /// Load `path` over the defaults, then apply environment overrides
    ///
    /// A missing file is not an error; an unreadable or invalid one is.
    pub fn load_layers(path: &Path) -> Result<Config> {
        let mut config = Self::load_defaults();

        if path.exists() {
            config = Self::load_file(path)?;
            tracing::debug!("Loaded configuration from {}", path.display());
        }

        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        Config::default()
    }

    /// Check the settings a run cannot proceed without
    ///
    /// Relation rules are left to the resolver, which reports and skips a
    /// malformed one.
    pub fn validate_settings(config: &Config) -> Result<()> {
        if config.max_depth == 0 {
            return Err(anyhow::anyhow!("maxDepth must be at least 1"));
        }
        Ok(())
    }

    /// Strict check used by `config validate`: settings plus every relation
    /// rule path
    pub fn validate(config: &Config) -> Result<()> {
        Self::validate_settings(config)?;

        for rule in &config.relations {
            Self::validate_rule(rule)?;
        }

        Ok(())
    }

    fn validate_rule(rule: &RelationRule) -> Result<()> {
        if rule.name.is_empty() {
            return Err(anyhow::anyhow!("Relation rule is missing a name"));
        }
        if rule.source.kind.is_empty() || rule.target.kind.is_empty() {
            return Err(anyhow::anyhow!(
                "Relation rule '{}' needs both a source and a target kind",
                rule.name
            ));
        }
        rule.compile()
            .with_context(|| format!("Relation rule '{}' has an invalid path", rule.name))?;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
        // KUBE_LINEAGE_SHOW_GROUP override
        if let Some(show_group) = var("KUBE_LINEAGE_SHOW_GROUP") {
            match show_group.parse::<bool>() {
                Ok(val) => config.show_group = val,
                Err(_) => tracing::warn!("Ignoring KUBE_LINEAGE_SHOW_GROUP={}", show_group),
            }
        }

        // KUBE_LINEAGE_MAX_DEPTH override
        if let Some(max_depth) = var("KUBE_LINEAGE_MAX_DEPTH") {
            match max_depth.parse::<usize>() {
                Ok(val) => config.max_depth = val,
                Err(_) => tracing::warn!("Ignoring KUBE_LINEAGE_MAX_DEPTH={}", max_depth),
            }
        }

        // KUBE_LINEAGE_OUTPUT override
        if let Some(output) = var("KUBE_LINEAGE_OUTPUT") {
            match output.parse() {
                Ok(val) => config.output = val,
                Err(e) => tracing::warn!("Ignoring KUBE_LINEAGE_OUTPUT: {}", e),
            }
        }

        config
    }
}
