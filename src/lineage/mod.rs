//! Lineage graph resolution and rendering
//!
//! Turns a snapshot of cluster objects into a tree of owners and dependents:
//!
//! 1. [`resolve_relationships`] derives owner -> dependent edges from owner
//!    references and relation rules.
//! 2. [`build_node_map`] assembles an immutable [`NodeMap`] with sorted,
//!    cycle-free dependents.
//! 3. [`TreePrinter`] walks the map from a root into [`DisplayRow`]s.

pub mod columns;
mod diagnostics;
mod disambiguation;
mod error;
mod graph;
mod models;
pub mod path;
mod printer;
mod relations;
mod target;

pub use columns::{
    CELL_UNKNOWN, CELL_UNSET, ColumnField, ColumnSpec, human_duration, object_columns,
    standard_columns, wide_columns,
};
pub use diagnostics::Diagnostic;
pub use disambiguation::KindGroupTable;
pub use error::{LineageError, PartialRender, PathError};
pub use graph::{GraphBuild, NodeMap, build_node_map};
pub use models::{DisplayRow, Edge, GroupKind, GroupVersionKind, Node, Relation};
pub use path::FieldPath;
pub use printer::{DEFAULT_MAX_DEPTH, RenderOptions, TreePrinter, print_node_map};
pub use relations::{MatchBy, RelationRule, Resolution, builtin_rules, resolve_relationships};
pub use target::{TargetRef, find_targets};

use serde_json::Value;

/// A resolved lineage graph and every diagnostic raised on the way
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    pub node_map: NodeMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve relationships and build the node map in one step
pub fn build_lineage(objects: Vec<Value>, rules: &[RelationRule]) -> Lineage {
    let resolution = resolve_relationships(&objects, rules);
    let build = build_node_map(objects, &resolution.edges);

    let mut diagnostics = resolution.diagnostics;
    diagnostics.extend(build.diagnostics);
    Lineage {
        node_map: build.node_map,
        diagnostics,
    }
}
