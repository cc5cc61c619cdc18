//! Lineage graph assembly
//!
//! Turns fetched objects plus resolved edges into an immutable [`NodeMap`]:
//! nodes keyed by UID, each with a sorted, cycle-free list of dependents.

use crate::lineage::diagnostics::Diagnostic;
use crate::lineage::error::LineageError;
use crate::lineage::models::{Edge, Node, object_label};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Immutable map from UID to node
///
/// Read-only after construction, so any number of renders may share it.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    nodes: HashMap<String, Node>,
}

impl NodeMap {
    /// Wrap nodes as-is, without validating or sorting dependents
    pub(crate) fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.uid.clone(), n)).collect(),
        }
    }

    pub fn get(&self, uid: &str) -> Option<&Node> {
        self.nodes.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.nodes.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Nodes that are nobody's dependent, in dependent sort order
    pub fn roots(&self) -> Vec<&Node> {
        let dependents: HashSet<&str> = self
            .nodes
            .values()
            .flat_map(|n| n.dependents.iter().map(String::as_str))
            .collect();
        let mut roots: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| !dependents.contains(n.uid.as_str()))
            .collect();
        roots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        roots
    }
}

/// A constructed node map and the problems found while building it
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub node_map: NodeMap,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    /// On the current traversal path
    InProgress,
    Done,
}

/// Build the node map for `objects` wired with `edges`
///
/// Later objects replace earlier ones with the same UID. Edges naming unknown
/// UIDs and duplicate edges are ignored. Dependents are ordered by group,
/// kind, namespace and name. Any edge that would close a cycle is dropped and
/// reported.
pub fn build_node_map(objects: Vec<Value>, edges: &[Edge]) -> GraphBuild {
    let mut build = GraphBuild::default();

    let mut nodes: HashMap<String, Node> = HashMap::new();
    for obj in objects {
        match Node::from_object(obj) {
            Ok(node) => {
                if nodes.insert(node.uid.clone(), node).is_some() {
                    tracing::debug!("Replaced duplicate object with a later copy");
                }
            }
            Err(e) => {
                let object = match e {
                    LineageError::MissingUid(label) => label,
                    other => other.to_string(),
                };
                let diagnostic = Diagnostic::MissingUid { object };
                diagnostic.report();
                build.diagnostics.push(diagnostic);
            }
        }
    }

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut seen_edges: HashSet<(&str, &str)> = HashSet::new();
    let mut has_owner: HashSet<&str> = HashSet::new();
    for edge in edges {
        if edge.owner == edge.dependent
            || !nodes.contains_key(&edge.owner)
            || !nodes.contains_key(&edge.dependent)
        {
            continue;
        }
        if !seen_edges.insert((edge.owner.as_str(), edge.dependent.as_str())) {
            continue;
        }
        has_owner.insert(edge.dependent.as_str());
        adjacency
            .entry(edge.owner.clone())
            .or_default()
            .push(edge.dependent.clone());
    }

    for children in adjacency.values_mut() {
        children.sort_by(|a, b| {
            let ka = nodes.get(a).map(Node::sort_key);
            let kb = nodes.get(b).map(Node::sort_key);
            ka.cmp(&kb)
        });
    }

    // Owner-less nodes first so cycles are cut as far from a real root as
    // possible, then everything else to reach cycles with no way in.
    let mut start_order: Vec<&Node> = nodes.values().collect();
    start_order.sort_by(|a, b| {
        let ka = (has_owner.contains(a.uid.as_str()), a.sort_key());
        let kb = (has_owner.contains(b.uid.as_str()), b.sort_key());
        ka.cmp(&kb)
    });
    let start_order: Vec<String> = start_order.into_iter().map(|n| n.uid.clone()).collect();

    let mut state: HashMap<String, VisitState> = HashMap::new();
    let mut kept: HashMap<String, Vec<String>> = HashMap::new();
    for start in start_order {
        if state.contains_key(&start) {
            continue;
        }
        state.insert(start.clone(), VisitState::InProgress);
        let mut stack: Vec<(String, usize)> = vec![(start, 0)];

        while let Some((uid, next)) = stack.pop() {
            let children = adjacency.get(&uid).map(Vec::as_slice).unwrap_or(&[]);
            let Some(child) = children.get(next) else {
                state.insert(uid, VisitState::Done);
                continue;
            };
            stack.push((uid.clone(), next + 1));

            match state.get(child) {
                Some(VisitState::InProgress) => {
                    let diagnostic = Diagnostic::CycleDropped {
                        owner: label(&nodes, &uid),
                        dependent: label(&nodes, child),
                    };
                    diagnostic.report();
                    build.diagnostics.push(diagnostic);
                }
                Some(VisitState::Done) => {
                    kept.entry(uid).or_default().push(child.clone());
                }
                None => {
                    kept.entry(uid).or_default().push(child.clone());
                    state.insert(child.clone(), VisitState::InProgress);
                    stack.push((child.clone(), 0));
                }
            }
        }
    }

    for (uid, dependents) in kept {
        if let Some(node) = nodes.get_mut(&uid) {
            node.dependents = dependents;
        }
    }

    tracing::debug!(
        "Built node map with {} nodes ({} diagnostics)",
        nodes.len(),
        build.diagnostics.len()
    );
    build.node_map = NodeMap { nodes };
    build
}

fn label(nodes: &HashMap<String, Node>, uid: &str) -> String {
    nodes
        .get(uid)
        .map(|n| object_label(&n.object))
        .unwrap_or_else(|| uid.to_string())
}
