//! Field-path queries over schemaless objects
//!
//! Supports a small JSONPath subset, enough for status columns and relation
//! rules:
//! - `.field` / `['dotted.key']` - object field access
//! - `.field.subfield` - nested access
//! - `[index]` - array access
//! - `[*]` / `.*` - every array element or object value
//! - `[?(@.field == "value")]` - equality filter (`!=` also accepted); on a
//!   single object the filter keeps or drops the object itself
//!
//! An optional `{...}` wrapper is accepted. Missing keys never error: the
//! branch simply produces no result.

use crate::lineage::error::PathError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A parsed field-path expression
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
    Wildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    /// Field chain below `@`, empty to compare the element itself
    fields: Vec<String>,
    negate: bool,
    literal: Value,
}

impl FieldPath {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let source = expr.trim();
        let body = source
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(source)
            .trim();

        let bytes = body.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    if bytes.get(pos + 1) == Some(&b'*') {
                        segments.push(Segment::Wildcard);
                        pos += 2;
                        continue;
                    }
                    let (field, next) = read_field(body, pos + 1)?;
                    segments.push(Segment::Field(field));
                    pos = next;
                }
                b'[' => {
                    let close = find_closing_bracket(body, pos)?;
                    segments.push(parse_bracket(&body[pos + 1..close])?);
                    pos = close + 1;
                }
                _ if pos == 0 => {
                    // Leading dot is optional
                    let (field, next) = read_field(body, 0)?;
                    segments.push(Segment::Field(field));
                    pos = next;
                }
                _ => {
                    return Err(PathError::UnexpectedChar {
                        ch: body[pos..].chars().next().unwrap_or_default(),
                        offset: pos,
                    });
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Every value the path resolves to, in document order
    pub fn find<'a>(&self, obj: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![obj];

        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    Segment::Field(name) => {
                        if let Some(v) = value.as_object().and_then(|m| m.get(name)) {
                            next.push(v);
                        }
                    }
                    Segment::Index(index) => {
                        if let Some(v) = value.as_array().and_then(|a| a.get(*index)) {
                            next.push(v);
                        }
                    }
                    Segment::Wildcard => match value {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    },
                    Segment::Filter(filter) => match value {
                        Value::Array(items) => {
                            next.extend(items.iter().filter(|item| filter.matches(item)))
                        }
                        Value::Object(_) if filter.matches(value) => next.push(value),
                        _ => {}
                    },
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }

    /// Every non-null result rendered as text
    pub fn find_strings(&self, obj: &Value) -> Vec<String> {
        self.find(obj)
            .into_iter()
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .collect()
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Filter {
    fn matches(&self, item: &Value) -> bool {
        let mut current = Some(item);
        for field in &self.fields {
            current = current.and_then(|v| v.get(field.as_str()));
        }
        match current {
            Some(value) => literal_eq(value, &self.literal) != self.negate,
            None => false,
        }
    }
}

/// Evaluate `path` against `obj` and join every result with a comma
///
/// Returns an empty string when nothing matches; only a malformed expression
/// is an error.
pub fn nested_string(obj: &Value, path: &str) -> Result<String, PathError> {
    let path = FieldPath::parse(path)?;
    Ok(path.find_strings(obj).join(","))
}

/// Render a JSON value the way a table cell shows it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn literal_eq(value: &Value, literal: &Value) -> bool {
    match (value, literal) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == literal,
    }
}

fn read_field(body: &str, start: usize) -> Result<(String, usize), PathError> {
    let end = body[start..]
        .find(['.', '['])
        .map(|i| start + i)
        .unwrap_or(body.len());
    let field = body[start..end].trim();
    if field.is_empty() {
        return Err(PathError::EmptyField(start));
    }
    Ok((field.to_string(), end))
}

/// Position of the `]` closing the bracket at `open`, skipping quoted text
fn find_closing_bracket(body: &str, open: usize) -> Result<usize, PathError> {
    let mut quote: Option<char> = None;
    for (i, ch) in body[open + 1..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, ']') => return Ok(open + 1 + i),
            (None, _) => {}
        }
    }
    Err(PathError::UnterminatedBracket(open))
}

fn parse_bracket(inner: &str) -> Result<Segment, PathError> {
    let inner = inner.trim();
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Some(filter) = inner.strip_prefix('?') {
        return parse_filter(filter.trim()).map(Segment::Filter);
    }
    if let Some(key) = unquote(inner) {
        return Ok(Segment::Field(key.to_string()));
    }
    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| PathError::InvalidIndex(inner.to_string()))
}

fn parse_filter(expr: &str) -> Result<Filter, PathError> {
    let invalid = || PathError::InvalidFilter(expr.to_string());

    let body = expr
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(invalid)?
        .trim();

    let (lhs, rhs, negate) = split_comparison(body).ok_or_else(invalid)?;

    let subject = lhs.trim().strip_prefix('@').ok_or_else(invalid)?;
    let fields = if subject.is_empty() {
        Vec::new()
    } else {
        let subject = subject.strip_prefix('.').ok_or_else(invalid)?;
        let fields: Vec<String> = subject.split('.').map(|f| f.trim().to_string()).collect();
        if fields.iter().any(|f| f.is_empty()) {
            return Err(invalid());
        }
        fields
    };

    let rhs = rhs.trim();
    let literal = match unquote(rhs) {
        Some(s) => Value::String(s.to_string()),
        None => serde_json::from_str::<Value>(rhs)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .ok_or_else(invalid)?,
    };

    Ok(Filter {
        fields,
        negate,
        literal,
    })
}

/// Split `lhs == rhs` or `lhs != rhs` at the first operator outside quotes
fn split_comparison(body: &str) -> Option<(&str, &str, bool)> {
    let mut quote: Option<char> = None;
    for (i, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '=' | '!') if body[i + 1..].starts_with('=') => {
                return Some((&body[..i], &body[i + 2..], ch == '!'));
            }
            (None, _) => {}
        }
    }
    None
}

fn unquote(s: &str) -> Option<&str> {
    let quoted = |q: char| s.len() >= 2 && s.starts_with(q) && s.ends_with(q);
    if quoted('"') || quoted('\'') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_simple() {
        let json = json!({
            "name": "test",
            "status": "ready"
        });

        assert_eq!(nested_string(&json, ".name").unwrap(), "test");
        assert_eq!(nested_string(&json, "status").unwrap(), "ready");
    }

    #[test]
    fn test_extract_nested() {
        let json = json!({
            "metadata": {
                "name": "test",
                "namespace": "default"
            }
        });

        assert_eq!(nested_string(&json, "{.metadata.name}").unwrap(), "test");
        assert_eq!(
            nested_string(&json, ".metadata.namespace").unwrap(),
            "default"
        );
    }

    #[test]
    fn test_extract_array_index() {
        let json = json!({
            "items": ["a", "b", "c"]
        });

        assert_eq!(nested_string(&json, ".items[0]").unwrap(), "a");
        assert_eq!(nested_string(&json, ".items[1]").unwrap(), "b");
        assert_eq!(nested_string(&json, ".items[7]").unwrap(), "");
    }

    #[test]
    fn test_bracket_field_with_dots() {
        let json = json!({
            "metadata": {"labels": {"app.kubernetes.io/name": "web"}}
        });

        assert_eq!(
            nested_string(&json, ".metadata.labels['app.kubernetes.io/name']").unwrap(),
            "web"
        );
    }

    #[test]
    fn test_wildcards() {
        let json = json!({
            "spec": {"volumes": [
                {"configMap": {"name": "a"}},
                {"secret": {"secretName": "s"}},
                {"configMap": {"name": "b"}}
            ]}
        });

        assert_eq!(
            nested_string(&json, ".spec.volumes[*].configMap.name").unwrap(),
            "a,b"
        );
        assert!(nested_string(&json, ".spec.*").unwrap().starts_with('['));
    }

    #[test]
    fn test_numeric_and_negated_filters() {
        let json = json!({
            "ports": [{"port": 80, "name": "http"}, {"port": 443, "name": "https"}]
        });

        assert_eq!(
            nested_string(&json, ".ports[?(@.port == 443)].name").unwrap(),
            "https"
        );
        assert_eq!(
            nested_string(&json, ".ports[?(@.name != 'http')].port").unwrap(),
            "443"
        );
    }

    #[test]
    fn test_operators_inside_quotes_are_literal() {
        let json = json!({
            "args": [{"value": "x==y", "n": 1}, {"value": "p!=q", "n": 2}]
        });

        assert_eq!(
            nested_string(&json, r#".args[?(@.value != "x==y")].n"#).unwrap(),
            "2"
        );
        assert_eq!(
            nested_string(&json, ".args[?(@.value == 'p!=q')].n").unwrap(),
            "2"
        );
        assert!(matches!(
            FieldPath::parse(r#".args[?(@.value "==")]"#),
            Err(PathError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_filter_on_object() {
        let json = json!({"roleRef": {"kind": "ClusterRole", "name": "view"}});

        assert_eq!(
            nested_string(&json, r#".roleRef[?(@.kind=="ClusterRole")].name"#).unwrap(),
            "view"
        );
        assert_eq!(
            nested_string(&json, r#".roleRef[?(@.kind=="Role")].name"#).unwrap(),
            ""
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            FieldPath::parse(".status[0"),
            Err(PathError::UnterminatedBracket(_))
        ));
        assert!(matches!(
            FieldPath::parse(".status..x"),
            Err(PathError::EmptyField(_))
        ));
        assert!(matches!(
            FieldPath::parse(".items[abc]"),
            Err(PathError::InvalidIndex(_))
        ));
        assert!(matches!(
            FieldPath::parse(".items[?(@.type ~ 1)]"),
            Err(PathError::InvalidFilter(_))
        ));
        assert_eq!(
            FieldPath::parse(".items[0]é"),
            Err(PathError::UnexpectedChar { ch: 'é', offset: 9 })
        );
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(3)), "3");
        assert_eq!(value_to_string(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
