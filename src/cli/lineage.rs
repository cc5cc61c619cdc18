//! The lineage command: fetch, resolve, render

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::lineage::{
    Diagnostic, DisplayRow, LineageError, RelationRule, RenderOptions, TargetRef, TreePrinter,
    build_lineage, builtin_rules, find_targets,
};
use crate::source::ObjectSource;

/// What to render and how
#[derive(Debug, Clone)]
pub struct LineageRequest {
    /// Object to render from; `None` renders every root
    pub target: Option<TargetRef>,
    /// Restricts target lookup to one namespace
    pub namespace: Option<String>,
    pub config: Config,
}

/// Rendered rows plus everything that went wrong on the way
#[derive(Debug)]
pub struct LineageReport {
    pub rows: Vec<DisplayRow>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when rendering stopped early; `rows` holds what was produced
    pub error: Option<LineageError>,
}

/// Built-in rules when enabled, followed by the configured ones
pub fn relation_rules(config: &Config) -> Vec<RelationRule> {
    let mut rules = if config.builtin_rules {
        builtin_rules()
    } else {
        Vec::new()
    };
    rules.extend(config.relations.iter().cloned());
    rules
}

/// Run one lineage request against `source`
///
/// Fails if the source cannot be read or the target does not exist. Render
/// failures are returned inside the report with the partial rows.
pub async fn run_lineage(
    source: &dyn ObjectSource,
    request: &LineageRequest,
    now: DateTime<Utc>,
) -> Result<LineageReport> {
    tracing::debug!("Fetching objects from {}", source.describe());
    let objects = source
        .fetch()
        .await
        .with_context(|| format!("Failed to fetch objects from {}", source.describe()))?;
    tracing::debug!("Fetched {} objects", objects.len());

    let lineage = build_lineage(objects, &relation_rules(&request.config));
    let options = RenderOptions {
        show_group: request.config.show_group,
        max_depth: request.config.max_depth,
        now,
    };
    let printer = TreePrinter::new(&lineage.node_map, options);

    let mut report = LineageReport {
        rows: Vec::new(),
        diagnostics: lineage.diagnostics.clone(),
        error: None,
    };

    let Some(target) = &request.target else {
        match printer.render_roots() {
            Ok(rows) => report.rows = rows,
            Err(partial) => {
                report.rows = partial.rows;
                report.error = Some(partial.error);
            }
        }
        return Ok(report);
    };

    let roots = find_targets(&lineage.node_map, target, request.namespace.as_deref());
    if roots.is_empty() {
        return Err(match &request.namespace {
            Some(ns) => anyhow::anyhow!("{} not found in namespace {}", target, ns),
            None => anyhow::anyhow!("{} not found", target),
        });
    }

    let uids: Vec<&str> = roots.iter().map(|n| n.uid.as_str()).collect();
    match printer.render_many(&uids) {
        Ok(rows) => report.rows = rows,
        Err(partial) => {
            report.rows = partial.rows;
            report.error = Some(partial.error);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockObjectSource;
    use serde_json::{Value, json};

    fn object(api_version: &str, kind: &str, name: &str, owner: Option<&str>) -> Value {
        let mut obj = json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": {"name": name, "namespace": "default", "uid": name}
        });
        if let Some(owner) = owner {
            obj["metadata"]["ownerReferences"] = json!([{"uid": owner, "kind": "x", "name": owner}]);
        }
        obj
    }

    fn mock_source(objects: Vec<Value>) -> MockObjectSource {
        let mut source = MockObjectSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(move || Ok(objects.clone()));
        source.expect_describe().return_const("mock".to_string());
        source
    }

    fn request(target: Option<&str>) -> LineageRequest {
        LineageRequest {
            target: target.and_then(|t| TargetRef::from_args(&[t.to_string()])),
            namespace: Some("default".to_string()),
            config: Config::default(),
        }
    }

    fn names(report: &LineageReport) -> Vec<&str> {
        report.rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_renders_target_lineage() {
        let source = mock_source(vec![
            object("apps/v1", "Deployment", "web", None),
            object("apps/v1", "ReplicaSet", "web-1", Some("web")),
            object("v1", "Pod", "web-1-a", Some("web-1")),
            object("v1", "ConfigMap", "unrelated", None),
        ]);

        let report = run_lineage(&source, &request(Some("deploy/web")), Utc::now())
            .await
            .unwrap();
        assert_eq!(
            names(&report),
            vec![
                "Deployment/web",
                "└── ReplicaSet/web-1",
                "    └── Pod/web-1-a"
            ]
        );
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_renders_all_roots_without_target() {
        let source = mock_source(vec![
            object("v1", "ConfigMap", "b", None),
            object("v1", "ConfigMap", "a", None),
        ]);

        let report = run_lineage(&source, &request(None), Utc::now()).await.unwrap();
        assert_eq!(names(&report), vec!["ConfigMap/a", "ConfigMap/b"]);
    }

    #[tokio::test]
    async fn test_missing_target_is_an_error() {
        let source = mock_source(vec![object("v1", "Pod", "web", None)]);

        let err = run_lineage(&source, &request(Some("pod/other")), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "pod/other not found in namespace default");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_propagated() {
        let mut source = MockObjectSource::new();
        source
            .expect_fetch()
            .returning(|| Err(anyhow::anyhow!("connection refused")));
        source.expect_describe().return_const("mock".to_string());

        let err = run_lineage(&source, &request(None), Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to fetch objects from mock"));
    }

    #[tokio::test]
    async fn test_depth_limit_keeps_partial_rows() {
        let source = mock_source(vec![
            object("v1", "ConfigMap", "a", None),
            object("v1", "ConfigMap", "b", Some("a")),
            object("v1", "ConfigMap", "c", Some("b")),
        ]);
        let mut req = request(Some("cm/a"));
        req.config.max_depth = 1;

        let report = run_lineage(&source, &req, Utc::now()).await.unwrap();
        assert_eq!(names(&report), vec!["ConfigMap/a", "└── ConfigMap/b"]);
        assert!(matches!(
            report.error,
            Some(LineageError::DepthExceeded { limit: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_broken_configured_rule_is_skipped() {
        let mut pod = object("v1", "Pod", "web-1", None);
        pod["spec"] = json!({"serviceAccountName": "web"});
        let source = mock_source(vec![pod, object("v1", "ServiceAccount", "web", None)]);

        let mut req = request(Some("sa/web"));
        req.config.relations.push(RelationRule::new(
            "broken",
            crate::lineage::GroupKind::new("", "Pod"),
            crate::lineage::GroupKind::new("", "ConfigMap"),
            ".spec.volumes[",
        ));

        let report = run_lineage(&source, &req, Utc::now()).await.unwrap();
        assert_eq!(names(&report), vec!["ServiceAccount/web", "└── Pod/web-1"]);
        assert!(matches!(
            report.diagnostics.as_slice(),
            [Diagnostic::MalformedRule { rule, .. }] if rule == "broken"
        ));
    }

    #[tokio::test]
    async fn test_group_qualification_is_shared_across_targets() {
        let namespaced = |api_version: &str, kind: &str, ns: &str, name: &str, owner: Option<&str>| {
            let mut obj = json!({
                "apiVersion": api_version,
                "kind": kind,
                "metadata": {"name": name, "namespace": ns, "uid": format!("{}-{}", ns, name)}
            });
            if let Some(owner) = owner {
                obj["metadata"]["ownerReferences"] = json!([{"uid": owner}]);
            }
            obj
        };
        // Only the tree in namespace a qualifies Configuration itself, via
        // the ambiguous Service above it
        let source = mock_source(vec![
            namespaced("apps/v1", "Deployment", "a", "web", None),
            namespaced("serving.knative.dev/v1", "Service", "a", "web-svc", Some("a-web")),
            namespaced("serving.knative.dev/v1", "Configuration", "a", "web-cfg", Some("a-web-svc")),
            namespaced("apps/v1", "Deployment", "b", "web", None),
            namespaced("serving.knative.dev/v1", "Configuration", "b", "web-other", Some("b-web")),
            namespaced("v1", "Service", "b", "api", None),
        ]);
        let mut req = request(Some("deploy/web"));
        req.namespace = None;

        let report = run_lineage(&source, &req, Utc::now()).await.unwrap();
        assert_eq!(
            names(&report),
            vec![
                "Deployment/web",
                "└── Service.serving.knative.dev/web-svc",
                "    └── Configuration.serving.knative.dev/web-cfg",
                "Deployment/web",
                "└── Configuration.serving.knative.dev/web-other",
            ]
        );
    }

    #[test]
    fn test_relation_rules_respect_config() {
        let mut config = Config::default();
        assert!(!relation_rules(&config).is_empty());

        config.builtin_rules = false;
        assert!(relation_rules(&config).is_empty());
    }
}
