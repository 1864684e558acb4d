//! KDL schema for config.kdl.
//!
//! ```kdl
//! store-root "/srv/abilities"
//! seed-defaults #false
//! output-format "human"  // or "json"
//! ```
//!
//! Unknown nodes are ignored. Values of the wrong KDL type are ignored.

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferences stored in config.kdl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Store root directory
    pub store_root: Option<PathBuf>,

    /// Write bundled defaults into a newly created store
    pub seed_defaults: Option<bool>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl AbilityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(node) = doc.get("store-root") {
            if let Some(s) = first_string(node) {
                if !s.trim().is_empty() {
                    config.store_root = Some(PathBuf::from(s));
                }
            }
        }

        if let Some(node) = doc.get("seed-defaults") {
            if let Some(entry) = node.entries().first() {
                config.seed_defaults = entry.value().as_bool();
            }
        }

        if let Some(node) = doc.get("output-format") {
            if let Some(s) = first_string(node) {
                config.output_format = OutputFormat::parse(s);
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref root) = self.store_root {
            let mut node = KdlNode::new("store-root");
            node.push(KdlEntry::new(KdlValue::String(root.display().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(seed) = self.seed_defaults {
            let mut node = KdlNode::new("seed-defaults");
            node.push(KdlEntry::new(KdlValue::Bool(seed)));
            doc.nodes_mut().push(node);
        }

        if let Some(format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &AbilityConfig) {
        if other.store_root.is_some() {
            self.store_root = other.store_root.clone();
        }
        if other.seed_defaults.is_some() {
            self.seed_defaults = other.seed_defaults;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
    }

    /// Load config from a file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;
        Ok(Self::from_kdl(&doc))
    }
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}
