//! Data structures for lineage graphs

use crate::lineage::error::LineageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type identity of a cluster object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split an `apiVersion` ("apps/v1", "v1") into group and version
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        GroupKind {
            group: self.group.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// Kind qualified by its API group, version-agnostic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GroupKind {
    /// API group, empty for the core group
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Renders as `Kind` for the core group and `Kind.group` otherwise
impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// One cluster object in the lineage graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: String,
    pub gvk: GroupVersionKind,
    /// The full object as fetched
    pub object: Value,
    /// UIDs of objects that depend on this one, in display order
    pub dependents: Vec<String>,
}

impl Node {
    /// Wrap a raw object, failing only when it carries no UID
    pub fn from_object(object: Value) -> Result<Self, LineageError> {
        let uid = object_uid(&object)
            .ok_or_else(|| LineageError::MissingUid(object_label(&object)))?
            .to_string();
        let gvk = object_gvk(&object);
        Ok(Self {
            uid,
            gvk,
            object,
            dependents: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        metadata_str(&self.object, "name").unwrap_or("")
    }

    pub fn namespace(&self) -> &str {
        metadata_str(&self.object, "namespace").unwrap_or("")
    }

    /// Creation timestamp, `None` when absent or unparsable
    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        metadata_str(&self.object, "creationTimestamp")
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Ordering key for dependents: group, kind, namespace, name, then uid
    pub fn sort_key(&self) -> (&str, &str, &str, &str, &str) {
        (
            &self.gvk.group,
            &self.gvk.kind,
            self.namespace(),
            self.name(),
            &self.uid,
        )
    }
}

/// How an edge was discovered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `metadata.ownerReferences` on the dependent
    OwnerReference,
    /// A relation rule, by rule name
    Rule(String),
}

/// Directed edge from an owner to one of its dependents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub owner: String,
    pub dependent: String,
    pub relation: Relation,
}

/// One rendered line of a lineage report
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    /// Tree prefix plus qualified name, e.g. `├── Pod/web-1`
    pub name: String,
    pub status: String,
    pub reason: String,
    pub age: String,
    /// Depth below the render root, 0 for the root itself
    pub depth: usize,
    pub object: Value,
}

impl DisplayRow {
    /// Cells in standard column order
    pub fn cells(&self) -> [&str; 4] {
        [&self.name, &self.status, &self.reason, &self.age]
    }
}

pub(crate) fn metadata_str<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    object
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(|v| v.as_str())
}

pub(crate) fn object_uid(object: &Value) -> Option<&str> {
    metadata_str(object, "uid").filter(|uid| !uid.is_empty())
}

pub(crate) fn object_gvk(object: &Value) -> GroupVersionKind {
    let api_version = object
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let kind = object.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    GroupVersionKind::from_api_version(api_version, kind)
}

/// `Kind/namespace/name` for log messages
pub(crate) fn object_label(object: &Value) -> String {
    let kind = object.get("kind").and_then(|k| k.as_str()).unwrap_or("?");
    let name = metadata_str(object, "name").unwrap_or("?");
    match metadata_str(object, "namespace") {
        Some(ns) if !ns.is_empty() => format!("{}/{}/{}", kind, ns, name),
        _ => format!("{}/{}", kind, name),
    }
}
