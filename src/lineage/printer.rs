//! Tree rendering
//!
//! Walks a [`NodeMap`] from one or more roots and produces display rows with
//! box-drawing prefixes:
//!
//! ```text
//! Deployment/web
//! ├── ReplicaSet/web-5d4f
//! │   └── Pod/web-5d4f-abcde
//! └── ReplicaSet/web-7c9b
//! ```
//!
//! Rendering runs in two passes over explicit work-lists. The layout pass
//! claims each reachable node for the first parent that reaches it in
//! depth-first order, so a node shared by several owners is shown once, and
//! fixes the group-display flag for every node. The emit pass turns that
//! layout into rows.
//!
//! A structural error (dangling dependent, depth limit) skips only the
//! offending subtree. Layout carries on with the remaining siblings so the
//! glyphs of the partial output still reflect each parent's full list, and
//! the first error is returned alongside the rows.

use crate::lineage::columns::object_columns;
use crate::lineage::disambiguation::KindGroupTable;
use crate::lineage::error::{LineageError, PartialRender};
use crate::lineage::graph::NodeMap;
use crate::lineage::models::{DisplayRow, Node};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Default limit on lineage depth below the root
pub const DEFAULT_MAX_DEPTH: usize = 64;

const TEE: &str = "├── ";
const CORNER: &str = "└── ";
const GUIDE: &str = "│   ";
const BLANK: &str = "    ";

/// Settings for one render
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Always display `Kind.group/name`
    pub show_group: bool,
    pub max_depth: usize,
    /// Reference instant for the Age column
    pub now: DateTime<Utc>,
}

impl RenderOptions {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            show_group: false,
            max_depth: DEFAULT_MAX_DEPTH,
            now,
        }
    }
}

/// Renders lineage trees from a shared node map
pub struct TreePrinter<'a> {
    node_map: &'a NodeMap,
    kinds: KindGroupTable,
    options: RenderOptions,
}

/// Claimed shape of one tree produced by the layout pass
struct Tree<'a> {
    root: &'a Node,
    children: HashMap<&'a str, Vec<&'a Node>>,
    /// Sticky group-display flag per node
    show_group: HashMap<&'a str, bool>,
}

impl<'a> TreePrinter<'a> {
    pub fn new(node_map: &'a NodeMap, options: RenderOptions) -> Self {
        Self {
            node_map,
            kinds: KindGroupTable::from_node_map(node_map),
            options,
        }
    }

    pub fn kinds(&self) -> &KindGroupTable {
        &self.kinds
    }

    /// Render the lineage below `root_uid`, root row first
    pub fn render(&self, root_uid: &str) -> Result<Vec<DisplayRow>, PartialRender> {
        self.render_many(&[root_uid])
    }

    /// Render one tree per UID as a single report
    ///
    /// Each tree is laid out on its own, so a requested root that also sits
    /// below another requested root is shown in both places. Group
    /// qualification is shared: a kind qualified in any tree is qualified in
    /// all of them.
    pub fn render_many(&self, root_uids: &[&str]) -> Result<Vec<DisplayRow>, PartialRender> {
        let mut error = None;
        let mut trees = Vec::new();
        for uid in root_uids {
            match self.node_map.get(uid) {
                Some(root) => trees.push(self.layout(root, &mut HashSet::new(), &mut error)),
                None => record(&mut error, LineageError::RootNotFound(uid.to_string())),
            }
        }
        self.finish(trees, error)
    }

    /// Render every root of the node map, one tree after another
    ///
    /// Nodes are claimed across the whole report, so an object reachable from
    /// several roots appears once.
    pub fn render_roots(&self) -> Result<Vec<DisplayRow>, PartialRender> {
        let mut error = None;
        let mut claimed: HashSet<&'a str> = HashSet::new();
        let mut trees = Vec::new();
        for root in self.node_map.roots() {
            if claimed.contains(root.uid.as_str()) {
                continue;
            }
            trees.push(self.layout(root, &mut claimed, &mut error));
        }
        self.finish(trees, error)
    }

    fn finish(
        &self,
        trees: Vec<Tree<'a>>,
        error: Option<LineageError>,
    ) -> Result<Vec<DisplayRow>, PartialRender> {
        let qualified_kinds = qualified_kinds(&trees);
        let mut rows = Vec::new();
        for tree in &trees {
            self.emit(tree, &qualified_kinds, &mut rows);
        }
        match error {
            None => Ok(rows),
            Some(error) => Err(PartialRender { rows, error }),
        }
    }

    /// Depth-first claim of every node reachable from `root`
    fn layout(
        &self,
        root: &'a Node,
        claimed: &mut HashSet<&'a str>,
        error: &mut Option<LineageError>,
    ) -> Tree<'a> {
        let mut tree = Tree {
            root,
            children: HashMap::new(),
            show_group: HashMap::new(),
        };
        claimed.insert(root.uid.as_str());
        let root_flag = self.options.show_group || self.kinds.is_ambiguous(&root.gvk.kind);
        tree.show_group.insert(root.uid.as_str(), root_flag);

        // (node, index of next dependent to inspect, depth)
        let mut stack: Vec<(&'a Node, usize, usize)> = vec![(root, 0, 0)];
        while let Some((node, next, depth)) = stack.pop() {
            let Some(child_uid) = node.dependents.get(next) else {
                continue;
            };
            stack.push((node, next + 1, depth));

            let Some(child) = self.node_map.get(child_uid) else {
                record(
                    error,
                    LineageError::DanglingDependent {
                        parent: node.uid.clone(),
                        dependent: child_uid.clone(),
                    },
                );
                continue;
            };
            if claimed.contains(child.uid.as_str()) {
                continue;
            }
            if depth + 1 > self.options.max_depth {
                record(
                    error,
                    LineageError::DepthExceeded {
                        uid: node.uid.clone(),
                        limit: self.options.max_depth,
                    },
                );
                continue;
            }

            claimed.insert(child.uid.as_str());
            let inherited = tree.show_group.get(node.uid.as_str()).copied();
            let flag = inherited.unwrap_or(false) || self.kinds.is_ambiguous(&child.gvk.kind);
            tree.show_group.insert(child.uid.as_str(), flag);
            tree.children
                .entry(node.uid.as_str())
                .or_default()
                .push(child);
            stack.push((child, 0, depth + 1));
        }

        tree
    }

    fn emit(&self, tree: &Tree<'a>, qualified_kinds: &HashSet<&str>, rows: &mut Vec<DisplayRow>) {
        rows.push(self.row(tree, tree.root, String::new(), qualified_kinds, 0));

        // (node, prefix for its dependents, index of next dependent, depth)
        let mut stack: Vec<(&Node, String, usize, usize)> = vec![(tree.root, String::new(), 0, 0)];
        while let Some((node, prefix, next, depth)) = stack.pop() {
            let children = tree
                .children
                .get(node.uid.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let Some(child) = children.get(next).copied() else {
                continue;
            };

            let (row_prefix, child_prefix) = if next + 1 == children.len() {
                (format!("{}{}", prefix, CORNER), format!("{}{}", prefix, BLANK))
            } else {
                (format!("{}{}", prefix, TEE), format!("{}{}", prefix, GUIDE))
            };
            rows.push(self.row(tree, child, row_prefix, qualified_kinds, depth + 1));

            stack.push((node, prefix, next + 1, depth));
            stack.push((child, child_prefix, 0, depth + 1));
        }
    }

    fn row(
        &self,
        tree: &Tree<'_>,
        node: &Node,
        prefix: String,
        qualified_kinds: &HashSet<&str>,
        depth: usize,
    ) -> DisplayRow {
        let show_group = tree
            .show_group
            .get(node.uid.as_str())
            .copied()
            .unwrap_or(false)
            || qualified_kinds.contains(node.gvk.kind.as_str());
        let columns = object_columns(node, show_group, self.options.now);

        DisplayRow {
            name: prefix + &columns.name,
            status: columns.status,
            reason: columns.reason,
            age: columns.age,
            depth,
            object: node.object.clone(),
        }
    }
}

/// Kinds that ended up group-qualified anywhere in the report, so one kind
/// never renders two ways
fn qualified_kinds<'a>(trees: &[Tree<'a>]) -> HashSet<&'a str> {
    let mut qualified = HashSet::new();
    for tree in trees {
        let nodes = std::iter::once(tree.root).chain(tree.children.values().flatten().copied());
        for node in nodes {
            if tree.show_group.get(node.uid.as_str()).copied().unwrap_or(false) {
                qualified.insert(node.gvk.kind.as_str());
            }
        }
    }
    qualified
}

/// Keep the first error of a render
fn record(error: &mut Option<LineageError>, found: LineageError) {
    if error.is_none() {
        *error = Some(found);
    }
}

/// Render the lineage below `root_uid` with a one-off printer
pub fn print_node_map(
    node_map: &NodeMap,
    root_uid: &str,
    options: RenderOptions,
) -> Result<Vec<DisplayRow>, PartialRender> {
    TreePrinter::new(node_map, options).render(root_uid)
}
