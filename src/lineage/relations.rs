//! Relationship resolution
//!
//! Derives owner -> dependent edges from a fetched object set, either from
//! `metadata.ownerReferences` or from declarative relation rules such as
//! "a Pod depends on the ConfigMaps named in its volumes".

use crate::lineage::diagnostics::Diagnostic;
use crate::lineage::error::PathError;
use crate::lineage::models::{
    Edge, GroupKind, Relation, metadata_str, object_gvk, object_label, object_uid,
};
use crate::lineage::path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// How the value resolved by a rule identifies its targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchBy {
    /// Each resolved string is a target name
    #[default]
    Name,
    /// Each resolved map is a label selector
    Labels,
}

/// Declarative non-ownership dependency
///
/// The source object holds the reference and becomes the dependent; every
/// target it resolves to becomes an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRule {
    pub name: String,
    pub source: GroupKind,
    pub target: GroupKind,
    pub path: String,
    #[serde(default)]
    pub match_by: MatchBy,
}

impl RelationRule {
    pub fn new(name: &str, source: GroupKind, target: GroupKind, path: &str) -> Self {
        Self {
            name: name.to_string(),
            source,
            target,
            path: path.to_string(),
            match_by: MatchBy::Name,
        }
    }

    pub fn by_labels(mut self) -> Self {
        self.match_by = MatchBy::Labels;
        self
    }

    pub fn compile(&self) -> Result<FieldPath, PathError> {
        FieldPath::parse(&self.path)
    }
}

/// Relation rules for the built-in Kubernetes kinds
pub fn builtin_rules() -> Vec<RelationRule> {
    let core = |kind: &str| GroupKind::new("", kind);
    let rbac = |kind: &str| GroupKind::new("rbac.authorization.k8s.io", kind);
    let ingress = GroupKind::new("networking.k8s.io", "Ingress");
    let storage_class = GroupKind::new("storage.k8s.io", "StorageClass");

    vec![
        RelationRule::new(
            "pod-configmap-volumes",
            core("Pod"),
            core("ConfigMap"),
            ".spec.volumes[*].configMap.name",
        ),
        RelationRule::new(
            "pod-configmap-env",
            core("Pod"),
            core("ConfigMap"),
            ".spec.containers[*].envFrom[*].configMapRef.name",
        ),
        RelationRule::new(
            "pod-secret-volumes",
            core("Pod"),
            core("Secret"),
            ".spec.volumes[*].secret.secretName",
        ),
        RelationRule::new(
            "pod-secret-env",
            core("Pod"),
            core("Secret"),
            ".spec.containers[*].envFrom[*].secretRef.name",
        ),
        RelationRule::new(
            "pod-image-pull-secrets",
            core("Pod"),
            core("Secret"),
            ".spec.imagePullSecrets[*].name",
        ),
        RelationRule::new(
            "pod-pvc-volumes",
            core("Pod"),
            core("PersistentVolumeClaim"),
            ".spec.volumes[*].persistentVolumeClaim.claimName",
        ),
        RelationRule::new(
            "pod-service-account",
            core("Pod"),
            core("ServiceAccount"),
            ".spec.serviceAccountName",
        ),
        RelationRule::new("pod-node", core("Pod"), core("Node"), ".spec.nodeName"),
        RelationRule::new(
            "pvc-volume",
            core("PersistentVolumeClaim"),
            core("PersistentVolume"),
            ".spec.volumeName",
        ),
        RelationRule::new(
            "pvc-storage-class",
            core("PersistentVolumeClaim"),
            storage_class.clone(),
            ".spec.storageClassName",
        ),
        RelationRule::new(
            "pv-storage-class",
            core("PersistentVolume"),
            storage_class,
            ".spec.storageClassName",
        ),
        RelationRule::new("service-pods", core("Service"), core("Pod"), ".spec.selector")
            .by_labels(),
        RelationRule::new(
            "ingress-services",
            ingress.clone(),
            core("Service"),
            ".spec.rules[*].http.paths[*].backend.service.name",
        ),
        RelationRule::new(
            "ingress-default-backend",
            ingress.clone(),
            core("Service"),
            ".spec.defaultBackend.service.name",
        ),
        RelationRule::new(
            "ingress-tls-secrets",
            ingress,
            core("Secret"),
            ".spec.tls[*].secretName",
        ),
        RelationRule::new(
            "rolebinding-role",
            rbac("RoleBinding"),
            rbac("Role"),
            r#".roleRef[?(@.kind=="Role")].name"#,
        ),
        RelationRule::new(
            "rolebinding-clusterrole",
            rbac("RoleBinding"),
            rbac("ClusterRole"),
            r#".roleRef[?(@.kind=="ClusterRole")].name"#,
        ),
        RelationRule::new(
            "rolebinding-service-accounts",
            rbac("RoleBinding"),
            core("ServiceAccount"),
            r#".subjects[?(@.kind=="ServiceAccount")].name"#,
        ),
        RelationRule::new(
            "clusterrolebinding-clusterrole",
            rbac("ClusterRoleBinding"),
            rbac("ClusterRole"),
            ".roleRef.name",
        ),
    ]
}

/// Edges discovered in an object set plus everything worth reporting
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        diagnostic.report();
        self.diagnostics.push(diagnostic);
    }
}

/// Lookup tables over the deduplicated object set
struct ObjectIndex<'a> {
    uids: HashSet<&'a str>,
    by_group_kind: HashMap<GroupKind, Vec<&'a Value>>,
    objects: Vec<&'a Value>,
}

impl<'a> ObjectIndex<'a> {
    /// Keeps the last occurrence of each UID, preserving input order
    fn new(objects: &'a [Value]) -> Self {
        let mut last_seen: HashMap<&str, usize> = HashMap::new();
        for (idx, obj) in objects.iter().enumerate() {
            if let Some(uid) = object_uid(obj) {
                last_seen.insert(uid, idx);
            }
        }

        let mut index = Self {
            uids: HashSet::new(),
            by_group_kind: HashMap::new(),
            objects: Vec::new(),
        };
        for (idx, obj) in objects.iter().enumerate() {
            let Some(uid) = object_uid(obj) else {
                continue;
            };
            if last_seen.get(uid) != Some(&idx) {
                continue;
            }
            index.uids.insert(uid);
            index
                .by_group_kind
                .entry(object_gvk(obj).group_kind())
                .or_default()
                .push(obj);
            index.objects.push(obj);
        }
        index
    }

    fn of_kind(&self, group_kind: &GroupKind) -> &[&'a Value] {
        self.by_group_kind
            .get(group_kind)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Derive every owner -> dependent edge in `objects`
///
/// Never fails: malformed rules and dangling owner references are recorded
/// as diagnostics and resolution carries on with the rest.
pub fn resolve_relationships(objects: &[Value], rules: &[RelationRule]) -> Resolution {
    let index = ObjectIndex::new(objects);
    let mut resolution = Resolution::default();

    for obj in &index.objects {
        resolve_owner_references(obj, &index, &mut resolution);
    }

    for rule in rules {
        let path = match rule.compile() {
            Ok(path) => path,
            Err(e) => {
                resolution.diagnose(Diagnostic::MalformedRule {
                    rule: rule.name.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let before = resolution.edges.len();
        for source in index.of_kind(&rule.source) {
            resolve_rule(rule, &path, source, &index, &mut resolution);
        }
        tracing::debug!(
            "Rule {} produced {} edges",
            rule.name,
            resolution.edges.len() - before
        );
    }

    tracing::debug!(
        "Resolved {} edges across {} objects ({} diagnostics)",
        resolution.edges.len(),
        index.objects.len(),
        resolution.diagnostics.len()
    );
    resolution
}

fn resolve_owner_references(obj: &Value, index: &ObjectIndex<'_>, resolution: &mut Resolution) {
    let Some(uid) = object_uid(obj) else {
        return;
    };
    let owner_refs = obj
        .get("metadata")
        .and_then(|m| m.get("ownerReferences"))
        .and_then(|o| o.as_array());

    for owner_ref in owner_refs.into_iter().flatten() {
        let Some(owner_uid) = owner_ref.get("uid").and_then(|u| u.as_str()) else {
            continue;
        };
        if owner_uid == uid {
            continue;
        }
        if index.uids.contains(owner_uid) {
            resolution.edges.push(Edge {
                owner: owner_uid.to_string(),
                dependent: uid.to_string(),
                relation: Relation::OwnerReference,
            });
        } else {
            resolution.diagnose(Diagnostic::UnresolvedOwner {
                dependent: object_label(obj),
                owner_uid: owner_uid.to_string(),
            });
        }
    }
}

fn resolve_rule(
    rule: &RelationRule,
    path: &FieldPath,
    source: &Value,
    index: &ObjectIndex<'_>,
    resolution: &mut Resolution,
) {
    let Some(source_uid) = object_uid(source) else {
        return;
    };
    let source_ns = metadata_str(source, "namespace").unwrap_or("");
    let candidates = index.of_kind(&rule.target);

    let mut matched: Vec<&str> = Vec::new();
    for value in path.find(source) {
        match rule.match_by {
            MatchBy::Name => {
                let Some(name) = value.as_str().filter(|n| !n.is_empty()) else {
                    continue;
                };
                for target in candidates {
                    let target_ns = metadata_str(target, "namespace").unwrap_or("");
                    if metadata_str(target, "name") == Some(name)
                        && (target_ns == source_ns || target_ns.is_empty())
                    {
                        matched.extend(object_uid(target));
                    }
                }
            }
            MatchBy::Labels => {
                let Some(selector) = value.as_object().filter(|s| !s.is_empty()) else {
                    continue;
                };
                for target in candidates {
                    let target_ns = metadata_str(target, "namespace").unwrap_or("");
                    if target_ns == source_ns && labels_match(target, selector) {
                        matched.extend(object_uid(target));
                    }
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for target_uid in matched {
        if target_uid == source_uid || !seen.insert(target_uid) {
            continue;
        }
        resolution.edges.push(Edge {
            owner: target_uid.to_string(),
            dependent: source_uid.to_string(),
            relation: Relation::Rule(rule.name.clone()),
        });
    }
}

fn labels_match(target: &Value, selector: &serde_json::Map<String, Value>) -> bool {
    let labels = target.get("metadata").and_then(|m| m.get("labels"));
    selector.iter().all(|(key, expected)| {
        labels.and_then(|l| l.get(key)).is_some_and(|actual| actual == expected)
    })
}
