//! Live cluster object source

use super::ObjectSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::{ApiResource, TypeMeta};
use kube::discovery::{Discovery, Scope, verbs};
use serde_json::Value;

/// Concurrent list requests in flight
const MAX_CONCURRENT_LISTS: usize = 16;
const PAGE_SIZE: u32 = 500;

/// Lists every listable resource type the API server advertises
pub struct ClusterSource {
    client: kube::Client,
    /// Namespace for namespaced kinds, `None` for all namespaces
    namespace: Option<String>,
    /// Kubeconfig context, for messages only
    context: Option<String>,
}

struct ListTarget {
    resource: ApiResource,
    namespaced: bool,
}

impl ClusterSource {
    pub fn new(client: kube::Client, namespace: Option<String>) -> Self {
        Self {
            client,
            namespace,
            context: None,
        }
    }

    /// Name the kubeconfig context the client was built from
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    fn api(&self, target: &ListTarget) -> Api<DynamicObject> {
        match (&self.namespace, target.namespaced) {
            (Some(ns), true) => Api::namespaced_with(self.client.clone(), ns, &target.resource),
            _ => Api::all_with(self.client.clone(), &target.resource),
        }
    }

    /// List one resource type page by page, stamping apiVersion and kind on
    /// every item
    async fn list(&self, target: &ListTarget) -> Result<Vec<Value>> {
        let api = self.api(target);
        let types = TypeMeta {
            api_version: target.resource.api_version.clone(),
            kind: target.resource.kind.clone(),
        };

        let mut objects = Vec::new();
        let mut params = ListParams::default().limit(PAGE_SIZE);
        loop {
            let page = api.list(&params).await?;
            for mut obj in page.items {
                obj.types = Some(types.clone());
                objects.push(
                    serde_json::to_value(&obj).context("Failed to serialize object to JSON")?,
                );
            }
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        Ok(objects)
    }
}

#[async_trait]
impl ObjectSource for ClusterSource {
    async fn fetch(&self) -> Result<Vec<Value>> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .context("Failed to discover API resources")?;

        let mut targets = Vec::new();
        for group in discovery.groups() {
            for (resource, caps) in group.recommended_resources() {
                if !caps.supports_operation(verbs::LIST) {
                    continue;
                }
                targets.push(ListTarget {
                    resource,
                    namespaced: matches!(caps.scope, Scope::Namespaced),
                });
            }
        }
        tracing::debug!("Listing {} resource types", targets.len());

        let lists: Vec<_> = targets.iter().map(|target| self.list(target)).collect();
        let results: Vec<Result<Vec<Value>>> = futures::stream::iter(lists)
            .buffered(MAX_CONCURRENT_LISTS)
            .collect()
            .await;

        let mut objects = Vec::new();
        for (target, result) in targets.iter().zip(results) {
            match result {
                Ok(items) => {
                    tracing::debug!(
                        "Listed {} {} objects",
                        items.len(),
                        target.resource.kind
                    );
                    objects.extend(items);
                }
                // Forbidden or unavailable APIs are skipped
                Err(e) => tracing::warn!(
                    "Skipping {}/{}: {}",
                    target.resource.api_version,
                    target.resource.plural,
                    e
                ),
            }
        }

        Ok(objects)
    }

    fn describe(&self) -> String {
        describe_cluster(self.context.as_deref(), self.namespace.as_deref())
    }
}

fn describe_cluster(context: Option<&str>, namespace: Option<&str>) -> String {
    let cluster = match context {
        Some(context) => format!("cluster {}", context),
        None => "cluster".to_string(),
    };
    match namespace {
        Some(ns) => format!("{} (namespace {})", cluster, ns),
        None => format!("{} (all namespaces)", cluster),
    }
}
