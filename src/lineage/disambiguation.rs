//! Kind/group disambiguation
//!
//! Two API groups may define the same kind, e.g. core `Service` and Knative
//! `Service.serving.knative.dev`. When a node map contains more than one
//! group for a kind, every object of that kind is displayed with its group.

use crate::lineage::graph::NodeMap;
use std::collections::{BTreeMap, BTreeSet};

/// Groups seen for every kind in a node map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindGroupTable {
    groups_by_kind: BTreeMap<String, BTreeSet<String>>,
}

impl KindGroupTable {
    /// Scan the whole map once; the result applies to every render from it
    pub fn from_node_map(node_map: &NodeMap) -> Self {
        let mut groups_by_kind: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in node_map.iter() {
            groups_by_kind
                .entry(node.gvk.kind.clone())
                .or_default()
                .insert(node.gvk.group.clone());
        }
        Self { groups_by_kind }
    }

    /// Whether `kind` exists in more than one group
    pub fn is_ambiguous(&self, kind: &str) -> bool {
        self.groups_by_kind
            .get(kind)
            .is_some_and(|groups| groups.len() > 1)
    }

    pub fn groups(&self, kind: &str) -> impl Iterator<Item = &str> {
        self.groups_by_kind
            .get(kind)
            .into_iter()
            .flat_map(|groups| groups.iter().map(String::as_str))
    }

    /// Kinds that need group qualification, sorted
    pub fn ambiguous_kinds(&self) -> Vec<&str> {
        self.groups_by_kind
            .iter()
            .filter(|(_, groups)| groups.len() > 1)
            .map(|(kind, _)| kind.as_str())
            .collect()
    }
}
