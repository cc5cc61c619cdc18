//! Tree rendering tests
//!
//! Build lineage graphs from object fixtures and check the rendered rows:
//! tree prefixes, ordering, columns and kind/group qualification.

use chrono::{DateTime, Duration, Utc};
use kube_lineage::lineage::{
    CELL_UNKNOWN, CELL_UNSET, DisplayRow, RenderOptions, TreePrinter, build_lineage,
    print_node_map,
};
use serde_json::{Value, json};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn object(api_version: &str, kind: &str, name: &str, owner: Option<&str>) -> Value {
    let mut obj = json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("{}-{}", kind.to_lowercase(), name),
            "creationTimestamp": (now() - Duration::minutes(5)).to_rfc3339(),
        }
    });
    if let Some(owner) = owner {
        obj["metadata"]["ownerReferences"] = json!([{"uid": owner}]);
    }
    obj
}

fn names(rows: &[DisplayRow]) -> Vec<&str> {
    rows.iter().map(|r| r.name.as_str()).collect()
}

fn render(objects: Vec<Value>, root: &str, options: RenderOptions) -> Vec<DisplayRow> {
    let lineage = build_lineage(objects, &[]);
    print_node_map(&lineage.node_map, root, options).unwrap()
}

fn deployment_fixture() -> Vec<Value> {
    vec![
        object("v1", "Pod", "web-b-1", Some("replicaset-web-b")),
        object("apps/v1", "ReplicaSet", "web-b", Some("deployment-web")),
        object("apps/v1", "Deployment", "web", None),
        object("apps/v1", "ReplicaSet", "web-a", Some("deployment-web")),
    ]
}

#[test]
fn test_tree_prefixes() {
    let rows = render(deployment_fixture(), "deployment-web", RenderOptions::new(now()));

    assert_eq!(
        names(&rows),
        vec![
            "Deployment/web",
            "├── ReplicaSet/web-a",
            "└── ReplicaSet/web-b",
            "    └── Pod/web-b-1",
        ]
    );
    let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
    assert_eq!(depths, vec![0, 1, 1, 2]);
}

#[test]
fn test_guide_lines_continue_below_non_last_child() {
    let objects = vec![
        object("v1", "ConfigMap", "root", None),
        object("v1", "ConfigMap", "a", Some("configmap-root")),
        object("v1", "ConfigMap", "a1", Some("configmap-a")),
        object("v1", "ConfigMap", "b", Some("configmap-root")),
    ];
    let rows = render(objects, "configmap-root", RenderOptions::new(now()));

    assert_eq!(
        names(&rows),
        vec![
            "ConfigMap/root",
            "├── ConfigMap/a",
            "│   └── ConfigMap/a1",
            "└── ConfigMap/b",
        ]
    );
}

#[test]
fn test_rendering_is_deterministic() {
    let mut shuffled = deployment_fixture();
    shuffled.reverse();

    let first = render(deployment_fixture(), "deployment-web", RenderOptions::new(now()));
    let second = render(shuffled, "deployment-web", RenderOptions::new(now()));
    assert_eq!(first, second);
}

#[test]
fn test_ready_condition_columns() {
    let mut pod = object("v1", "Pod", "web", None);
    pod["status"] = json!({
        "conditions": [
            {"type": "Initialized", "status": "True"},
            {"type": "Ready", "status": "False", "reason": "ContainersNotReady"}
        ]
    });
    let rows = render(vec![pod], "pod-web", RenderOptions::new(now()));

    assert_eq!(rows[0].status, "False");
    assert_eq!(rows[0].reason, "ContainersNotReady");
    assert_eq!(rows[0].age, "5m");
}

#[test]
fn test_sentinels_for_missing_fields() {
    let pod = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "bare", "uid": "bare"}
    });
    let rows = render(vec![pod], "bare", RenderOptions::new(now()));

    assert_eq!(rows[0].cells(), ["Pod/bare", CELL_UNSET, CELL_UNSET, CELL_UNKNOWN]);
}

#[test]
fn test_raw_object_is_carried() {
    let rows = render(deployment_fixture(), "deployment-web", RenderOptions::new(now()));
    assert_eq!(rows[3].object["metadata"]["name"], "web-b-1");
}

#[test]
fn test_shared_dependent_rendered_once() {
    let mut shared = object("v1", "Secret", "shared", None);
    shared["metadata"]["ownerReferences"] =
        json!([{"uid": "configmap-left"}, {"uid": "configmap-right"}]);
    let objects = vec![
        object("v1", "ConfigMap", "root", None),
        object("v1", "ConfigMap", "left", Some("configmap-root")),
        object("v1", "ConfigMap", "right", Some("configmap-root")),
        shared,
    ];
    let rows = render(objects, "configmap-root", RenderOptions::new(now()));

    assert_eq!(
        names(&rows),
        vec![
            "ConfigMap/root",
            "├── ConfigMap/left",
            "│   └── Secret/shared",
            "└── ConfigMap/right",
        ]
    );
}

#[test]
fn test_ambiguous_kinds_are_qualified() {
    let objects = vec![
        object("v1", "Service", "api", None),
        object("serving.knative.dev/v1", "Service", "web", None),
        object(
            "serving.knative.dev/v1",
            "Configuration",
            "web",
            Some("service-web"),
        ),
        object("v1", "Pod", "web-1", Some("configuration-web")),
    ];
    let lineage = build_lineage(objects, &[]);
    let printer = TreePrinter::new(&lineage.node_map, RenderOptions::new(now()));
    assert_eq!(printer.kinds().ambiguous_kinds(), vec!["Service"]);

    // The root's qualification carries down to every descendant
    let rows = printer.render("service-web").unwrap();
    assert_eq!(
        names(&rows),
        vec![
            "Service.serving.knative.dev/web",
            "└── Configuration.serving.knative.dev/web",
            "    └── Pod/web-1",
        ]
    );

    let rows = printer.render("service-api").unwrap();
    assert_eq!(names(&rows), vec!["Service/api"]);
}

#[test]
fn test_kind_is_never_rendered_two_ways() {
    let objects = vec![
        object("v1", "Service", "api", None),
        object("v1", "ConfigMap", "root", None),
        object(
            "serving.knative.dev/v1",
            "Configuration",
            "y",
            Some("configmap-root"),
        ),
        object(
            "serving.knative.dev/v1",
            "Service",
            "web",
            Some("configmap-root"),
        ),
        object(
            "serving.knative.dev/v1",
            "Configuration",
            "x",
            Some("service-web"),
        ),
    ];
    let rows = render(objects, "configmap-root", RenderOptions::new(now()));

    // Configuration/y has no qualified ancestor but shares its kind with x
    assert_eq!(
        names(&rows),
        vec![
            "ConfigMap/root",
            "├── Configuration.serving.knative.dev/y",
            "└── Service.serving.knative.dev/web",
            "    └── Configuration.serving.knative.dev/x",
        ]
    );
}

#[test]
fn test_unambiguous_kinds_stay_short() {
    let rows = render(deployment_fixture(), "deployment-web", RenderOptions::new(now()));
    assert!(rows.iter().all(|r| !r.name.contains(".apps")));
}

#[test]
fn test_show_group_option() {
    let options = RenderOptions {
        show_group: true,
        ..RenderOptions::new(now())
    };
    let rows = render(deployment_fixture(), "deployment-web", options);

    assert_eq!(
        names(&rows),
        vec![
            "Deployment.apps/web",
            "├── ReplicaSet.apps/web-a",
            "└── ReplicaSet.apps/web-b",
            "    └── Pod/web-b-1",
        ]
    );
}

#[test]
fn test_render_roots() {
    let mut objects = deployment_fixture();
    objects.push(object("v1", "ConfigMap", "standalone", None));

    let lineage = build_lineage(objects, &[]);
    let printer = TreePrinter::new(&lineage.node_map, RenderOptions::new(now()));
    let rows = printer.render_roots().unwrap();

    assert_eq!(
        names(&rows),
        vec![
            "ConfigMap/standalone",
            "Deployment/web",
            "├── ReplicaSet/web-a",
            "└── ReplicaSet/web-b",
            "    └── Pod/web-b-1",
        ]
    );
}

#[test]
fn test_render_from_subtree() {
    let rows = render(
        deployment_fixture(),
        "replicaset-web-b",
        RenderOptions::new(now()),
    );
    assert_eq!(names(&rows), vec!["ReplicaSet/web-b", "└── Pod/web-b-1"]);
}
