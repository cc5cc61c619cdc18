//! Non-fatal problems found while resolving a lineage graph

use std::fmt;

/// A problem local to one object, rule or edge
///
/// Diagnostics never stop resolution; they are logged and handed back to the
/// caller alongside the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A relation rule whose path could not be parsed; the rule is skipped
    MalformedRule { rule: String, error: String },
    /// An owner reference to an object outside the fetched set
    UnresolvedOwner { dependent: String, owner_uid: String },
    /// An edge dropped because it would close a cycle
    CycleDropped { owner: String, dependent: String },
    /// An object without a UID; it cannot take part in the graph
    MissingUid { object: String },
}

impl Diagnostic {
    /// Log at warn level
    pub fn report(&self) {
        tracing::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedRule { rule, error } => {
                write!(f, "skipping relation rule {}: {}", rule, error)
            }
            Diagnostic::UnresolvedOwner {
                dependent,
                owner_uid,
            } => write!(
                f,
                "owner {} of {} is not in the fetched set, showing it as a root",
                owner_uid, dependent
            ),
            Diagnostic::CycleDropped { owner, dependent } => write!(
                f,
                "dropping edge {} -> {}: it would create a cycle",
                owner, dependent
            ),
            Diagnostic::MissingUid { object } => {
                write!(f, "ignoring object {} without metadata.uid", object)
            }
        }
    }
}
