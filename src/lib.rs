//! kube-lineage library
//!
//! Resolves the owner/dependent lineage of Kubernetes objects and renders it
//! as a tree. Used by the `kube-lineage` binary and by integration tests.

pub mod cli;
pub mod config;
pub mod kube;
pub mod lineage;
pub mod output;
pub mod source;

// Re-export commonly used types for convenience
pub use lineage::{
    DisplayRow, Lineage, NodeMap, RelationRule, RenderOptions, TreePrinter, build_lineage,
    build_node_map, print_node_map, resolve_relationships,
};
pub use output::{OutputFormat, format_rows};
pub use source::{ClusterSource, FileSource, ObjectSource};
