//! Output formats for rendered lineage rows

use crate::lineage::{ColumnSpec, DisplayRow, GroupVersionKind, standard_columns, wide_columns};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// How rendered rows are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// NAME, STATUS, REASON and AGE columns
    #[default]
    Table,
    /// Table with a leading NAMESPACE column
    Wide,
    /// A v1 List of the objects, in tree order
    Json,
    Yaml,
    /// One `kind.group/name` per row
    Name,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Wide => "wide",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Name => "name",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" | "" => Ok(OutputFormat::Table),
            "wide" => Ok(OutputFormat::Wide),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "name" => Ok(OutputFormat::Name),
            other => Err(anyhow::anyhow!(
                "Unknown output format '{}', expected one of: table, wide, json, yaml, name",
                other
            )),
        }
    }
}

/// Format `rows` as a complete document, trailing newline included
pub fn format_rows(rows: &[DisplayRow], format: OutputFormat, no_headers: bool) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(rows, &standard_columns(), no_headers)),
        OutputFormat::Wide => Ok(format_table(rows, &wide_columns(), no_headers)),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&object_list(rows))
                .context("Failed to serialize objects to JSON")?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Yaml => serde_yaml::to_string(&object_list(rows))
            .context("Failed to serialize objects to YAML"),
        OutputFormat::Name => Ok(rows.iter().map(|row| format!("{}\n", qualified_name(row))).collect()),
    }
}

/// Aligned text table
///
/// Every column is padded to its widest cell, counted in characters so tree
/// glyphs line up, with two spaces between columns. The last column is not
/// padded.
pub fn format_table(rows: &[DisplayRow], columns: &[ColumnSpec], no_headers: bool) -> String {
    let mut lines: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    if !no_headers {
        lines.push(columns.iter().map(|c| c.name.to_uppercase()).collect());
    }
    for row in rows {
        lines.push(columns.iter().map(|c| row.cell(c.field)).collect());
    }

    let mut widths = vec![0; columns.len()];
    for line in &lines {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in &lines {
        let last = line.len().saturating_sub(1);
        for (i, cell) in line.iter().enumerate() {
            out.push_str(cell);
            if i < last {
                let pad = widths[i] - cell.chars().count() + 2;
                out.extend(std::iter::repeat_n(' ', pad));
            }
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }
    out
}

fn object_list(rows: &[DisplayRow]) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": rows.iter().map(|row| row.object.clone()).collect::<Vec<_>>(),
    })
}

/// `kind.group/name` as kubectl prints it, `kind/name` for the core group
fn qualified_name(row: &DisplayRow) -> String {
    let api_version = row.object["apiVersion"].as_str().unwrap_or_default();
    let kind = row.object["kind"].as_str().unwrap_or_default();
    let name = row.object["metadata"]["name"].as_str().unwrap_or_default();
    let gvk = GroupVersionKind::from_api_version(api_version, kind);

    let kind = gvk.kind.to_lowercase();
    if gvk.group.is_empty() {
        format!("{}/{}", kind, name)
    } else {
        format!("{}.{}/{}", kind, gvk.group, name)
    }
}
