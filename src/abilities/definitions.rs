//! Ability document types.
//!
//! This module defines the core types for ability documents:
//! - `AbilityType`: The five document types and their storage folders
//! - `AbilityDocument`: One loaded document with normalized metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Priority applied when a document omits it or gives a non-numeric value.
pub const DEFAULT_PRIORITY: i64 = 100;

/// File extension recognized as an ability document.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Storage folders under the store root, one per physical document class.
pub const TYPE_FOLDERS: &[&str] = &["personas", "rules", "policies", "repos"];

/// Type of an ability document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityType {
    /// Root document selected per request.
    Persona,
    /// Behavioral rule.
    Rule,
    /// Policy statement.
    Policy,
    /// Style statement, stored and resolved like a policy.
    Style,
    /// Repository-specific constraints.
    Repo,
}

impl AbilityType {
    /// All recognized types.
    pub const ALL: [AbilityType; 5] = [
        AbilityType::Persona,
        AbilityType::Rule,
        AbilityType::Policy,
        AbilityType::Style,
        AbilityType::Repo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityType::Persona => "persona",
            AbilityType::Rule => "rule",
            AbilityType::Policy => "policy",
            AbilityType::Style => "style",
            AbilityType::Repo => "repo",
        }
    }

    /// Folder (relative to the store root) holding documents of this type.
    pub fn folder(&self) -> &'static str {
        match self {
            AbilityType::Persona => "personas",
            AbilityType::Rule => "rules",
            AbilityType::Policy | AbilityType::Style => "policies",
            AbilityType::Repo => "repos",
        }
    }

    /// Type inferred for documents found in a top-level folder.
    pub fn from_folder(folder: &str) -> Option<Self> {
        match folder {
            "personas" => Some(AbilityType::Persona),
            "rules" => Some(AbilityType::Rule),
            "policies" => Some(AbilityType::Policy),
            "repos" => Some(AbilityType::Repo),
            _ => None,
        }
    }

    /// Type inferred from this type's folder (`style` lives with `policy`).
    pub fn folder_type(&self) -> Self {
        match self {
            AbilityType::Style => AbilityType::Policy,
            other => *other,
        }
    }

    /// Tie-break rank used when ordering a selection.
    pub fn rank(&self) -> u8 {
        match self {
            AbilityType::Persona => 0,
            AbilityType::Repo => 1,
            AbilityType::Rule => 2,
            AbilityType::Policy | AbilityType::Style => 3,
        }
    }

    /// Policy and style documents form one class.
    pub fn is_policy_class(&self) -> bool {
        matches!(self, AbilityType::Policy | AbilityType::Style)
    }

    /// Whether documents of this type are selected by tag matching.
    pub fn is_tag_matched(&self) -> bool {
        matches!(
            self,
            AbilityType::Rule | AbilityType::Policy | AbilityType::Style
        )
    }
}

impl std::fmt::Display for AbilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AbilityType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "persona" => Ok(AbilityType::Persona),
            "rule" => Ok(AbilityType::Rule),
            "policy" => Ok(AbilityType::Policy),
            "style" => Ok(AbilityType::Style),
            "repo" => Ok(AbilityType::Repo),
            _ => Err(crate::Error::Config(format!(
                "Unknown ability type: '{}'. Expected one of persona, rule, policy, style, repo.",
                s
            ))),
        }
    }
}

/// A loaded ability document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDocument {
    /// Unique identifier within a catalog (e.g. `rule.backend.base`).
    pub id: String,

    #[serde(rename = "type")]
    pub ability_type: AbilityType,

    /// Lower-cased tags used for tag-match selection.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Ids pulled in transitively when this document is selected.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Alternate identifiers for persona/repo lookup.
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub priority: i64,

    /// Informational only; the resolver does not filter on it.
    #[serde(default)]
    pub deprecated: bool,

    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,

    pub body: String,

    /// Location relative to the store root, `/`-separated.
    pub path: String,

    /// File modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AbilityDocument {
    /// Create a document with default metadata.
    pub fn new(id: impl Into<String>, ability_type: AbilityType, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ability_type,
            tags: BTreeSet::new(),
            includes: Vec::new(),
            aliases: Vec::new(),
            name: None,
            priority: DEFAULT_PRIORITY,
            deprecated: false,
            supersedes: None,
            body: body.into().trim().to_string(),
            path: String::new(),
            updated_at: None,
        }
    }

    /// Set tags (lower-cased).
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
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

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// First tag (in sorted order) that appears in `effective`.
    pub fn matching_tag(&self, effective: &BTreeSet<String>) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| effective.contains(*tag))
            .map(String::as_str)
    }

    /// One-line description for human output.
    pub fn summary(&self) -> String {
        let mut line = format!("{} [{}] priority {}", self.id, self.ability_type, self.priority);
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            line.push_str(&format!(" tags: {}", tags.join(", ")));
        }
        if self.deprecated {
            line.push_str(" (deprecated)");
        }
        line
    }
}
