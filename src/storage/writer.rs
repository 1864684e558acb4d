//! Writing ability documents into the store tree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::abilities::definitions::{AbilityDocument, AbilityType, DEFAULT_PRIORITY, DOCUMENT_EXTENSION};
use crate::storage::loader;
use crate::{Error, Result};

/// Input for [`write`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Document type name, parsed on write.
    #[serde(rename = "type")]
    pub ability_type: String,
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    pub body: String,
    /// Subdirectory under the type folder.
    #[serde(default, alias = "relativeDir", skip_serializing_if = "Option::is_none")]
    pub relative_dir: Option<String>,
    /// File name to use instead of one derived from the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
}

impl WriteRequest {
    pub fn new(ability_type: impl Into<String>, id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            ability_type: ability_type.into(),
            id: id.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn with_supersedes(mut self, supersedes: impl Into<String>) -> Self {
        self.supersedes = Some(supersedes.into());
        self
    }

    pub fn in_dir(mut self, relative_dir: impl Into<String>) -> Self {
        self.relative_dir = Some(relative_dir.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Validate `request`, write it under `root`, and return the reloaded document.
pub fn write(root: &Path, request: &WriteRequest) -> Result<AbilityDocument> {
    let ability_type: AbilityType = request.ability_type.parse()?;

    let id = request.id.trim();
    if id.is_empty() {
        return Err(Error::Config("Document id is required".to_string()));
    }
    check_reference("id", id)?;
    let supersedes = request
        .supersedes
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(supersedes) = supersedes {
        check_reference("supersedes", supersedes)?;
    }

    let priority = match request.priority {
        Some(priority) if !priority.is_finite() => {
            return Err(Error::Config(format!(
                "Priority must be a finite number, got {}",
                priority
            )));
        }
        Some(priority) => priority.trunc() as i64,
        None => DEFAULT_PRIORITY,
    };

    let body = request.body.trim();
    if body.is_empty() {
        return Err(Error::Config("Document body is required".to_string()));
    }

    let segments = sanitize_relative_dir(request.relative_dir.as_deref())?;
    let slug = file_slug(request.filename.as_deref(), id)?;

    let target = target_path(root, ability_type, &segments, &slug);
    if target.exists() && !request.overwrite {
        return Err(Error::Config(format!(
            "Document already exists: {} (pass overwrite to replace it)",
            target.display()
        )));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let header = Header {
        id,
        ability_type,
        priority,
        supersedes,
    };
    fs::write(&target, serialize(request, &header, body))?;
    info!(id = %id, path = %target.display(), "Wrote ability document");

    loader::load_file(root, &target, ability_type.folder_type())
}

/// Ids are single tokens: no whitespace or control characters.
fn check_reference(field: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::Config(format!(
            "Document {} must not contain whitespace: {:?}",
            field, value
        )));
    }
    Ok(())
}

fn target_path(root: &Path, ability_type: AbilityType, segments: &[String], slug: &str) -> PathBuf {
    let mut path = root.join(ability_type.folder());
    for segment in segments {
        path.push(segment);
    }
    path.push(format!("{}.{}", slug, DOCUMENT_EXTENSION));
    path
}

/// Split a relative directory into safe segments.
///
/// Separators are normalized to `/`; empty and `.` segments are dropped.
/// Absolute paths, drive prefixes and `..` segments are rejected.
pub fn sanitize_relative_dir(raw: Option<&str>) -> Result<Vec<String>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let normalized = raw.trim().replace('\\', "/");

    let bytes = normalized.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if normalized.starts_with('/') || has_drive || Path::new(&normalized).is_absolute() {
        return Err(Error::Config(format!(
            "Relative directory must not be absolute: {}",
            raw
        )));
    }

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => {
                return Err(Error::Config(format!(
                    "Relative directory escapes the store root: {}",
                    raw
                )));
            }
            segment => segments.push(segment.to_string()),
        }
    }
    Ok(segments)
}

/// File name stem from an explicit filename or the id suffix after its first `.`.
pub fn file_slug(filename: Option<&str>, id: &str) -> Result<String> {
    let source = match filename.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filename) => filename
            .strip_suffix(&format!(".{}", DOCUMENT_EXTENSION))
            .unwrap_or(filename),
        None => id.split_once('.').map(|(_, rest)| rest).unwrap_or(id),
    };

    let mut slug = String::with_capacity(source.len());
    for c in source.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches(|c: char| c == '-' || c == '.').to_lowercase();

    if slug.is_empty() {
        return Err(Error::Config(format!(
            "Cannot derive a file name from '{}'",
            source
        )));
    }
    Ok(slug)
}

struct Header<'a> {
    id: &'a str,
    ability_type: AbilityType,
    priority: i64,
    supersedes: Option<&'a str>,
}

fn serialize(request: &WriteRequest, header: &Header<'_>, body: &str) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("id: {}\n", quote_if_needed(header.id)));
    out.push_str(&format!("type: {}\n", header.ability_type));
    push_list(&mut out, "tags", &request.tags);
    out.push_str(&format!("priority: {}\n", header.priority));
    if let Some(name) = single_line(request.name.as_deref()) {
        out.push_str(&format!("name: {}\n", quote_if_needed(&name)));
    }
    push_list(&mut out, "aliases", &request.aliases);
    push_list(&mut out, "includes", &request.includes);
    if request.deprecated {
        out.push_str("deprecated: true\n");
    }
    if let Some(supersedes) = header.supersedes {
        out.push_str(&format!("supersedes: {}\n", quote_if_needed(supersedes)));
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out.push('\n');
    out
}

fn push_list(out: &mut String, key: &str, items: &[String]) {
    let items: Vec<String> = items
        .iter()
        .filter_map(|item| single_line(Some(item)))
        .collect();
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("{}:\n", key));
    for item in items {
        out.push_str(&format!("  - {}\n", quote_if_needed(&item)));
    }
}

/// Wrap values the header parser would otherwise read as a list or unquote.
fn quote_if_needed(value: &str) -> String {
    let bracketed = value.starts_with('[') && value.ends_with(']');
    let quoted = value.len() >= 2
        && ['"', '\''].iter().any(|&q| value.starts_with(q) && value.ends_with(q));
    if !bracketed && !quoted {
        return value.to_string();
    }
    if value.starts_with('"') || value.ends_with('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

fn single_line(value: Option<&str>) -> Option<String> {
    let value = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_write_and_reload() {
        let env = TestEnv::new();
        let request = WriteRequest::new("rule", "rule.backend.base", "  Validate input.  ")
            .with_tags(["Backend", "api"])
            .with_priority(120.7)
            .with_includes(["rule.core.communication"])
            .in_dir("backend");

        let doc = write(&env.root(), &request).unwrap();
        assert_eq!(doc.id, "rule.backend.base");
        assert_eq!(doc.ability_type, AbilityType::Rule);
        assert_eq!(doc.priority, 120);
        assert_eq!(doc.path, "rules/backend/backend.base.md");
        assert_eq!(doc.body, "Validate input.");
        assert_eq!(doc.includes, vec!["rule.core.communication"]);
        assert!(doc.tags.contains("backend"));
    }

    #[test]
    fn test_serialized_field_order() {
        let env = TestEnv::new();
        let request = WriteRequest::new("repo", "repo.svc", "Body")
            .with_tags(["python"])
            .with_name("Service")
            .with_aliases(["svc"])
            .with_includes(["rule.a"])
            .with_deprecated(true)
            .with_supersedes("repo.old");
        let doc = write(&env.root(), &request).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Service"));
        assert_eq!(doc.aliases, vec!["svc"]);
        assert_eq!(doc.includes, vec!["rule.a"]);
        assert!(doc.deprecated);
        assert_eq!(doc.supersedes.as_deref(), Some("repo.old"));
        assert!(doc.tags.contains("python"));

        let content = std::fs::read_to_string(env.root().join("repos/svc.md")).unwrap();
        assert_eq!(
            content,
            "---\nid: repo.svc\ntype: repo\ntags:\n  - python\npriority: 100\nname: Service\naliases:\n  - svc\nincludes:\n  - rule.a\ndeprecated: true\nsupersedes: repo.old\n---\n\nBody\n"
        );
    }

    #[test]
    fn test_empty_optional_fields_omitted() {
        let env = TestEnv::new();
        write(&env.root(), &WriteRequest::new("persona", "persona.x", "Hi")).unwrap();
        let content = std::fs::read_to_string(env.root().join("personas/x.md")).unwrap();
        assert_eq!(content, "---\nid: persona.x\ntype: persona\npriority: 100\n---\n\nHi\n");
    }

    #[test]
    fn test_style_goes_to_policies_folder() {
        let env = TestEnv::new();
        let doc = write(&env.root(), &WriteRequest::new("style", "style.concise", "Brief.")).unwrap();
        assert_eq!(doc.path, "policies/concise.md");
        assert_eq!(doc.ability_type, AbilityType::Style);
    }

    #[test]
    fn test_empty_body_is_config_error() {
        let env = TestEnv::new();
        let err = write(&env.root(), &WriteRequest::new("rule", "rule.x", "   ")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_id_is_config_error() {
        let env = TestEnv::new();
        let err = write(&env.root(), &WriteRequest::new("rule", " ", "body")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let env = TestEnv::new();
        let err = write(&env.root(), &WriteRequest::new("skill", "skill.x", "body")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_non_finite_priority_is_config_error() {
        let env = TestEnv::new();
        for priority in [f64::NAN, f64::INFINITY] {
            let request = WriteRequest::new("rule", "rule.x", "body").with_priority(priority);
            assert!(matches!(write(&env.root(), &request), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_traversal_is_config_error() {
        let env = TestEnv::new();
        let request = WriteRequest::new("rule", "rule.x", "body").in_dir("../escape");
        let err = write(&env.root(), &request).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!env.path().join("escape").exists());
    }

    #[test]
    fn test_existing_target_requires_overwrite() {
        let env = TestEnv::new();
        let request = WriteRequest::new("rule", "rule.x", "first");
        write(&env.root(), &request).unwrap();

        let second = WriteRequest::new("rule", "rule.x", "second");
        assert!(matches!(write(&env.root(), &second), Err(Error::Config(_))));

        let doc = write(&env.root(), &second.with_overwrite(true)).unwrap();
        assert_eq!(doc.body, "second");
    }

    #[test]
    fn test_multiline_id_is_config_error() {
        let env = TestEnv::new();
        let request = WriteRequest::new("rule", "rule.x\n---\nInjected", "Real body")
            .with_tags(["backend"]);
        assert!(matches!(write(&env.root(), &request), Err(Error::Config(_))));

        let request = WriteRequest::new("rule", "rule.x", "body").with_supersedes("rule.old\ntags: [x]");
        assert!(matches!(write(&env.root(), &request), Err(Error::Config(_))));
        assert!(!env.root().join("rules").exists());
    }

    #[test]
    fn test_ambiguous_values_survive_reload() {
        let env = TestEnv::new();
        let request = WriteRequest::new("repo", "repo.beta", "Body")
            .with_name("[Beta]")
            .with_aliases(["'svc'", "\"quoted\""]);
        let doc = write(&env.root(), &request).unwrap();
        assert_eq!(doc.name.as_deref(), Some("[Beta]"));
        assert_eq!(doc.aliases, vec!["'svc'", "\"quoted\""]);

        let request = WriteRequest::new("repo", "repo.quoted", "Body").with_name("'Svc'");
        let doc = write(&env.root(), &request).unwrap();
        assert_eq!(doc.name.as_deref(), Some("'Svc'"));
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("plain"), "plain");
        assert_eq!(quote_if_needed("[Beta]"), "\"[Beta]\"");
        assert_eq!(quote_if_needed("'Svc'"), "\"'Svc'\"");
        assert_eq!(quote_if_needed("\"Svc\""), "'\"Svc\"'");
    }

    #[test]
    fn test_sanitize_relative_dir() {
        assert!(sanitize_relative_dir(None).unwrap().is_empty());
        assert_eq!(
            sanitize_relative_dir(Some(".\\team//backend/./")).unwrap(),
            vec!["team", "backend"]
        );
        for bad in ["../x", "a/../../b", "/abs", "\\abs", "C:/x", "c:\\x"] {
            assert!(sanitize_relative_dir(Some(bad)).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug(None, "rule.backend.base").unwrap(), "backend.base");
        assert_eq!(file_slug(None, "standalone").unwrap(), "standalone");
        assert_eq!(file_slug(Some("My Rule!.md"), "rule.x").unwrap(), "my-rule");
        assert_eq!(file_slug(Some("  "), "rule.Fallback").unwrap(), "fallback");
        assert!(file_slug(None, "rule.").is_err());
        assert!(file_slug(Some("!!!"), "rule.x").is_err());
    }
}
