//! Column definitions and per-object column extraction

use crate::lineage::models::{DisplayRow, Node};
use crate::lineage::path::nested_string;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Cell value for a field that is logically absent
pub const CELL_UNSET: &str = "<none>";
/// Cell value for a missing or invalid creation timestamp
pub const CELL_UNKNOWN: &str = "<unknown>";

const READY_STATUS_PATH: &str = r#"{.status.conditions[?(@.type=="Ready")].status}"#;
const READY_REASON_PATH: &str = r#"{.status.conditions[?(@.type=="Ready")].reason}"#;

/// Which value a column displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnField {
    Name,
    Namespace,
    Status,
    Reason,
    Age,
}

/// Display column descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub description: String,
    #[serde(skip)]
    pub field: ColumnField,
}

impl ColumnSpec {
    fn new(name: &str, format: &str, description: &str, field: ColumnField) -> Self {
        Self {
            name: name.to_string(),
            column_type: "string".to_string(),
            format: format.to_string(),
            description: description.to_string(),
            field,
        }
    }
}

/// The four standard lineage columns: Name, Status, Reason, Age
pub fn standard_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new(
            "Name",
            "name",
            "Name must be unique within a namespace.",
            ColumnField::Name,
        ),
        ColumnSpec::new(
            "Status",
            "",
            "The condition Ready status of the object.",
            ColumnField::Status,
        ),
        ColumnSpec::new(
            "Reason",
            "",
            "The condition Ready reason of the object.",
            ColumnField::Reason,
        ),
        ColumnSpec::new(
            "Age",
            "",
            "CreationTimestamp is a timestamp representing the server time when this object was created.",
            ColumnField::Age,
        ),
    ]
}

/// Standard columns with a Namespace column ahead of Name
pub fn wide_columns() -> Vec<ColumnSpec> {
    let mut columns = standard_columns();
    columns.insert(
        0,
        ColumnSpec::new(
            "Namespace",
            "",
            "Namespace defines the space within which each name must be unique.",
            ColumnField::Namespace,
        ),
    );
    columns
}

/// Column values for a single object, before tree prefixing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectColumns {
    pub name: String,
    pub status: String,
    pub reason: String,
    pub age: String,
}

/// Compute the standard columns for `node`
///
/// `show_group` selects `Kind.group/name` over `Kind/name`.
pub fn object_columns(node: &Node, show_group: bool, now: DateTime<Utc>) -> ObjectColumns {
    let qualifier = if show_group {
        node.gvk.group_kind().to_string()
    } else {
        node.gvk.kind.clone()
    };

    ObjectColumns {
        name: format!("{}/{}", qualifier, node.name()),
        status: ready_condition_field(node, READY_STATUS_PATH),
        reason: ready_condition_field(node, READY_REASON_PATH),
        age: translate_timestamp_since(node.creation_timestamp(), now),
    }
}

fn ready_condition_field(node: &Node, path: &str) -> String {
    match nested_string(&node.object, path) {
        Ok(value) if !value.is_empty() => value,
        Ok(_) => CELL_UNSET.to_string(),
        Err(e) => {
            tracing::warn!("Invalid column expression {}: {}", path, e);
            CELL_UNSET.to_string()
        }
    }
}

/// Elapsed time since `timestamp` in human-readable form
pub fn translate_timestamp_since(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match timestamp {
        Some(ts) => human_duration(now.signed_duration_since(ts)),
        None => CELL_UNKNOWN.to_string(),
    }
}

/// Format a duration using the coarsest sensible units
///
/// Two units are shown while the leading one is small ("1m30s", "3h4m",
/// "2d5h", "3y20d"), one unit otherwise ("45m", "400d").
pub fn human_duration(d: Duration) -> String {
    let seconds = d.num_seconds();
    if seconds < -1 {
        return "<invalid>".to_string();
    } else if seconds < 0 {
        return "0s".to_string();
    } else if seconds < 60 {
        return format!("{}s", seconds);
    }

    let minutes = d.num_minutes();
    if minutes < 10 {
        let s = seconds % 60;
        if s == 0 {
            return format!("{}m", minutes);
        }
        return format!("{}m{}s", minutes, s);
    } else if minutes < 60 * 3 {
        return format!("{}m", minutes);
    }

    let hours = d.num_hours();
    if hours < 8 {
        let m = minutes % 60;
        if m == 0 {
            return format!("{}h", hours);
        }
        return format!("{}h{}m", hours, m);
    } else if hours < 48 {
        return format!("{}h", hours);
    } else if hours < 24 * 8 {
        let h = hours % 24;
        if h == 0 {
            return format!("{}d", hours / 24);
        }
        return format!("{}d{}h", hours / 24, h);
    } else if hours < 24 * 365 * 2 {
        return format!("{}d", hours / 24);
    } else if hours < 24 * 365 * 8 {
        let days = (hours / 24) % 365;
        if days == 0 {
            return format!("{}y", hours / 24 / 365);
        }
        return format!("{}y{}d", hours / 24 / 365, days);
    }

    format!("{}y", hours / 24 / 365)
}

impl DisplayRow {
    /// Cell for a column, deriving namespace from the raw object
    pub fn cell(&self, field: ColumnField) -> String {
        match field {
            ColumnField::Name => self.name.clone(),
            ColumnField::Namespace => self
                .object
                .get("metadata")
                .and_then(|m| m.get("namespace"))
                .and_then(|ns| ns.as_str())
                .filter(|ns| !ns.is_empty())
                .unwrap_or(CELL_UNSET)
                .to_string(),
            ColumnField::Status => self.status.clone(),
            ColumnField::Reason => self.reason.clone(),
            ColumnField::Age => self.age.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn node(extra: serde_json::Value) -> Node {
        let mut obj = json!({
            "apiVersion": "serving.knative.dev/v1",
            "kind": "Service",
            "metadata": {"name": "hello", "uid": "u1"}
        });
        if let (Some(base), Some(extra)) = (obj.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        Node::from_object(obj).unwrap()
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(Duration::seconds(-5)), "<invalid>");
        assert_eq!(human_duration(Duration::seconds(0)), "0s");
        assert_eq!(human_duration(Duration::seconds(30)), "30s");
        assert_eq!(human_duration(Duration::seconds(90)), "1m30s");
        assert_eq!(human_duration(Duration::seconds(120)), "2m");
        assert_eq!(human_duration(Duration::minutes(45)), "45m");
        assert_eq!(human_duration(Duration::minutes(184)), "3h4m");
        assert_eq!(human_duration(Duration::hours(30)), "30h");
        assert_eq!(human_duration(Duration::hours(53)), "2d5h");
        assert_eq!(human_duration(Duration::days(400)), "400d");
        assert_eq!(human_duration(Duration::days(750)), "2y20d");
        assert_eq!(human_duration(Duration::days(365 * 10)), "10y");
    }

    #[test]
    fn test_columns_ready_condition() {
        let node = node(json!({
            "status": {"conditions": [
                {"type": "Available", "status": "False", "reason": "Nope"},
                {"type": "Ready", "status": "True", "reason": "Healthy"}
            ]}
        }));

        let columns = object_columns(&node, false, now());
        assert_eq!(columns.name, "Service/hello");
        assert_eq!(columns.status, "True");
        assert_eq!(columns.reason, "Healthy");
        assert_eq!(columns.age, CELL_UNKNOWN);
    }

    #[test]
    fn test_columns_without_conditions() {
        let columns = object_columns(&node(json!({})), true, now());
        assert_eq!(columns.name, "Service.serving.knative.dev/hello");
        assert_eq!(columns.status, CELL_UNSET);
        assert_eq!(columns.reason, CELL_UNSET);
    }

    #[test]
    fn test_duplicate_ready_conditions_are_joined() {
        let node = node(json!({
            "status": {"conditions": [
                {"type": "Ready", "status": "True"},
                {"type": "Ready", "status": "False"}
            ]}
        }));

        assert_eq!(object_columns(&node, false, now()).status, "True,False");
    }

    #[test]
    fn test_age_from_creation_timestamp() {
        let node = node(json!({
            "metadata": {"name": "hello", "uid": "u1", "creationTimestamp": "2024-06-01T11:58:30Z"}
        }));

        assert_eq!(object_columns(&node, false, now()).age, "1m30s");
    }

    #[test]
    fn test_wide_columns_order() {
        let names: Vec<String> = wide_columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Namespace", "Name", "Status", "Reason", "Age"]);
    }
}
