//! Object sources
//!
//! A source produces the complete object snapshot a lineage is built from:
//! every object of every kind, as raw JSON values.

mod cluster;
mod file;

pub use cluster::ClusterSource;
pub use file::FileSource;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Something that can produce an object snapshot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetch every object this source can see
    async fn fetch(&self) -> Result<Vec<Value>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Parse a YAML or JSON document stream into individual objects
///
/// Accepts a single object, any `*List` with `items`, or several YAML
/// documents separated by `---`. Empty documents are skipped.
pub fn parse_objects(content: &str) -> Result<Vec<Value>> {
    let mut objects = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let yaml = serde_yaml::Value::deserialize(document)
            .with_context(|| format!("Failed to parse document {}", index + 1))?;
        if yaml.is_null() {
            continue;
        }
        let value: Value = serde_json::to_value(yaml)
            .with_context(|| format!("Document {} is not a valid object", index + 1))?;
        flatten_into(value, &mut objects);
    }

    Ok(objects)
}

fn flatten_into(value: Value, objects: &mut Vec<Value>) {
    let is_list = value
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.ends_with("List"))
        && value.get("items").is_some_and(Value::is_array);

    if is_list {
        if let Value::Object(mut map) = value {
            if let Some(Value::Array(items)) = map.remove("items") {
                for item in items {
                    flatten_into(item, objects);
                }
            }
        }
    } else if value.is_object() {
        objects.push(value);
    } else {
        tracing::warn!("Skipping non-object document: {}", value);
    }
}
