//! Locating the object a lineage is rendered from

use crate::lineage::graph::NodeMap;
use crate::lineage::models::{GroupVersionKind, Node};
use std::fmt;

/// Well-known kubectl short names
const SHORT_NAMES: &[(&str, &str)] = &[
    ("cm", "configmap"),
    ("cj", "cronjob"),
    ("crd", "customresourcedefinition"),
    ("deploy", "deployment"),
    ("ds", "daemonset"),
    ("ep", "endpoints"),
    ("hpa", "horizontalpodautoscaler"),
    ("ing", "ingress"),
    ("netpol", "networkpolicy"),
    ("no", "node"),
    ("ns", "namespace"),
    ("pdb", "poddisruptionbudget"),
    ("po", "pod"),
    ("pv", "persistentvolume"),
    ("pvc", "persistentvolumeclaim"),
    ("rs", "replicaset"),
    ("sa", "serviceaccount"),
    ("sc", "storageclass"),
    ("sts", "statefulset"),
    ("svc", "service"),
];

/// A `RESOURCE/NAME` reference given by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    /// Kind, plural, short name or `kind.group`, any case
    pub resource: String,
    pub name: String,
}

impl TargetRef {
    /// Accepts `RESOURCE/NAME` or `RESOURCE NAME`
    pub fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [single] => {
                let (resource, name) = single.split_once('/')?;
                Self::new(resource, name)
            }
            [resource, name] => Self::new(resource, name),
            _ => None,
        }
    }

    fn new(resource: &str, name: &str) -> Option<Self> {
        if resource.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            resource: resource.to_lowercase(),
            name: name.to_string(),
        })
    }

    /// Whether this reference names objects of type `gvk`
    pub fn matches_kind(&self, gvk: &GroupVersionKind) -> bool {
        let (resource, group) = match self.resource.split_once('.') {
            Some((resource, group)) => (resource, Some(group)),
            None => (self.resource.as_str(), None),
        };
        if group.is_some_and(|g| !g.eq_ignore_ascii_case(&gvk.group)) {
            return false;
        }

        let resource = SHORT_NAMES
            .iter()
            .find(|(short, _)| *short == resource)
            .map(|(_, kind)| *kind)
            .unwrap_or(resource);
        let kind = gvk.kind.to_lowercase();
        resource == kind || resource == plural(&kind)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.name)
    }
}

/// Simple English plural of a lowercase kind, as API resources are named
fn plural(kind: &str) -> String {
    if kind.ends_with("ss") || kind.ends_with('x') || kind.ends_with("ch") || kind.ends_with("sh") {
        format!("{}es", kind)
    } else if kind.ends_with('s') {
        kind.to_string()
    } else if let Some(stem) = kind.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{}s", kind)
        } else {
            format!("{}ies", stem)
        }
    } else {
        format!("{}s", kind)
    }
}

/// Every node matching `target`, optionally limited to one namespace
///
/// Cluster-scoped objects match regardless of the namespace filter.
pub fn find_targets<'a>(
    node_map: &'a NodeMap,
    target: &TargetRef,
    namespace: Option<&str>,
) -> Vec<&'a Node> {
    let mut found: Vec<&Node> = node_map
        .iter()
        .filter(|node| node.name() == target.name && target.matches_kind(&node.gvk))
        .filter(|node| match namespace {
            Some(ns) => node.namespace().is_empty() || node.namespace() == ns,
            None => true,
        })
        .collect();
    found.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gvk(api_version: &str, kind: &str) -> GroupVersionKind {
        GroupVersionKind::from_api_version(api_version, kind)
    }

    #[test]
    fn test_from_args() {
        let single = TargetRef::from_args(&["deploy/web".to_string()]).unwrap();
        assert_eq!(single.resource, "deploy");
        assert_eq!(single.name, "web");

        let pair = TargetRef::from_args(&["Pod".to_string(), "web-1".to_string()]).unwrap();
        assert_eq!(pair.resource, "pod");

        assert!(TargetRef::from_args(&["web".to_string()]).is_none());
        assert!(TargetRef::from_args(&[]).is_none());
    }

    #[test]
    fn test_matches_kind() {
        let deploy = gvk("apps/v1", "Deployment");
        for resource in ["deployment", "deployments", "deploy", "deployment.apps"] {
            let target = TargetRef::new(resource, "x").unwrap();
            assert!(target.matches_kind(&deploy), "{} should match", resource);
        }
        assert!(!TargetRef::new("deployment.extensions", "x").unwrap().matches_kind(&deploy));

        let policy = gvk("networking.k8s.io/v1", "NetworkPolicy");
        assert!(TargetRef::new("networkpolicies", "x").unwrap().matches_kind(&policy));

        let ingress_class = gvk("networking.k8s.io/v1", "IngressClass");
        assert!(TargetRef::new("ingressclasses", "x").unwrap().matches_kind(&ingress_class));
    }
}
