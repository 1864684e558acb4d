//! Frontmatter parsing for ability documents.
//!
//! A document may start with a header block bounded by `---` lines:
//!
//! ```text
//! ---
//! id: rule.backend.base
//! tags: [backend, api]
//! priority: 120
//! includes:
//!   - rule.core.communication
//! ---
//!
//! Body text.
//! ```
//!
//! Only a flat subset is understood: scalars, booleans, integers, inline lists
//! and block lists. Lines that do not fit are dropped, so a hand-edited header
//! with a typo still loads.

use serde::Serialize;
use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// A parsed header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    Integer(i64),
    List(Vec<String>),
}

impl FieldValue {
    /// Scalar rendered as a string. Lists have no scalar form.
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::List(_) => None,
        }
    }

    /// Items of a list field. A scalar string is split on commas.
    pub fn as_list(&self) -> Vec<String> {
        let items: Vec<String> = match self {
            FieldValue::List(items) => items.clone(),
            FieldValue::String(s) => s.split(',').map(str::to_string).collect(),
            FieldValue::Bool(b) => vec![b.to_string()],
            FieldValue::Integer(i) => vec![i.to_string()],
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Header fields and trimmed body of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub fields: BTreeMap<String, FieldValue>,
    pub body: String,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Parse document text into header fields and body.
///
/// Text without a complete `---` header block is all body.
pub fn parse(text: &str) -> Frontmatter {
    let normalized = text.replace("\r\n", "\n");
    let normalized = normalized.strip_prefix('\u{feff}').unwrap_or(&normalized);

    match split_header(normalized) {
        Some((header, body)) => Frontmatter {
            fields: parse_header(header),
            body: body.trim().to_string(),
        },
        None => Frontmatter {
            fields: BTreeMap::new(),
            body: normalized.trim().to_string(),
        },
    }
}

/// Split `(header, body)` when the first line and a later line are `---`.
fn split_header(text: &str) -> Option<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            return Some((&text[header_start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Line-oriented state machine; the only state is the open block-list key.
fn parse_header(header: &str) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    let mut list_key: Option<String> = None;

    for line in header.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(item) = parse_list_item(trimmed) {
            if let Some(ref key) = list_key {
                if let Some(FieldValue::List(items)) = fields.get_mut(key) {
                    items.push(item.to_string());
                }
            }
            continue;
        }

        match parse_key_line(trimmed) {
            Some((key, "")) => {
                fields.insert(key.to_string(), FieldValue::List(Vec::new()));
                list_key = Some(key.to_string());
            }
            Some((key, value)) => {
                fields.insert(key.to_string(), parse_value(value));
                list_key = None;
            }
            // Unparseable lines are dropped.
            None => {}
        }
    }

    fields
}

fn parse_key_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid { Some((key, value.trim())) } else { None }
}

fn parse_list_item(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('-')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let item = unquote(rest.trim());
    if item.is_empty() { None } else { Some(item) }
}

fn parse_value(raw: &str) -> FieldValue {
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let items = inner
            .split(',')
            .map(|item| unquote(item.trim()).to_string())
            .filter(|item| !item.is_empty())
            .collect();
        return FieldValue::List(items);
    }

    let unquoted = unquote(raw);
    if unquoted.len() != raw.len() {
        return FieldValue::String(unquoted.to_string());
    }

    match raw {
        "true" => return FieldValue::Bool(true),
        "false" => return FieldValue::Bool(false),
        _ => {}
    }

    if is_integer_literal(raw) {
        if let Ok(value) = raw.parse::<i64>() {
            return FieldValue::Integer(value);
        }
    }

    FieldValue::String(raw.to_string())
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
