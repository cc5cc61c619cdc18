//! Configuration system for kube-lineage
//!
//! Layered YAML configuration: built-in defaults, the root config file, then
//! environment variable overrides. Command-line flags win over all of them.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::Config;

/// Get a configuration value by key
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "showGroup" => Ok(config.show_group.to_string()),
        "maxDepth" => Ok(config.max_depth.to_string()),
        "output" => Ok(config.output.to_string()),
        "noHeaders" => Ok(config.no_headers.to_string()),
        "builtinRules" => Ok(config.builtin_rules.to_string()),
        "relations" => {
            // Return as YAML array
            serde_yaml::to_string(&config.relations)
                .map_err(|e| anyhow::anyhow!("Failed to serialize relations: {}", e))
        }
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}
