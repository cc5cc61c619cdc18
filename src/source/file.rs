//! File object source

use super::{ObjectSource, parse_objects};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Reads objects from a local YAML or JSON file
///
/// Useful for offline analysis of `kubectl get -o yaml` dumps.
pub struct FileSource {
    file_path: PathBuf,
}

impl FileSource {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        tracing::debug!("Created file source: {:?}", file_path);
        Self { file_path }
    }
}

#[async_trait]
impl ObjectSource for FileSource {
    async fn fetch(&self) -> Result<Vec<Value>> {
        tracing::debug!("Reading objects from file: {:?}", self.file_path);

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", self.file_path))?;

        let objects = parse_objects(&content)
            .with_context(|| format!("Failed to parse objects from file: {:?}", self.file_path))?;

        tracing::debug!(
            "Loaded {} objects from file: {:?}",
            objects.len(),
            self.file_path
        );

        Ok(objects)
    }

    fn describe(&self) -> String {
        format!("file {}", self.file_path.display())
    }
}
