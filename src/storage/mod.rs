//! Storage layer for ability documents.
//!
//! An ability store is a plain directory tree:
//!
//! ```text
//! <root>/
//!   personas/   persona documents
//!   rules/      rule documents
//!   policies/   policy and style documents
//!   repos/      repository constraint documents
//! ```
//!
//! Every read walks the tree again; there is no cache and no locking.
//! Concurrent writers are not coordinated.

pub mod loader;
pub mod writer;

pub use writer::WriteRequest;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::abilities::{
    AbilityDocument, AbilityType, Catalog, ResolutionRequest, ResolutionResult, TYPE_FOLDERS,
    default_documents, resolver,
};
use crate::{Error, Result};

/// Document counts and freshness for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub root: String,
    pub total: usize,
    /// Count per type name; every type is present.
    pub counts: BTreeMap<String, usize>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Ability store rooted at a directory.
#[derive(Debug, Clone)]
pub struct AbilityStore {
    root: PathBuf,
}

impl AbilityStore {
    /// Open the store at `root`, creating the folder layout.
    ///
    /// When the root did not exist yet and `seed_defaults` is set, the bundled
    /// default documents are written into it.
    pub fn open(root: impl Into<PathBuf>, seed_defaults: bool) -> Result<Self> {
        let root = root.into();
        let fresh = !root.exists();

        ensure_layout(&root)?;
        if fresh && seed_defaults {
            seed(&root)?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List documents, optionally restricted to one type name.
    pub fn list_documents(&self, type_filter: Option<&str>) -> Result<Vec<AbilityDocument>> {
        let type_filter = type_filter.map(str::parse::<AbilityType>).transpose()?;
        loader::load(&self.root, type_filter)
    }

    /// Load the whole tree into a catalog.
    pub fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(loader::load(&self.root, None)?))
    }

    /// Get a document by exact id.
    pub fn get_document(&self, id: &str) -> Result<AbilityDocument> {
        self.catalog()?
            .get(id.trim())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Ability document {}", id.trim())))
    }

    /// Resolve a request against a fresh load of the tree.
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult> {
        let catalog = self.catalog()?;
        resolver::resolve(&catalog, request)
    }

    pub fn write_document(&self, request: &WriteRequest) -> Result<AbilityDocument> {
        writer::write(&self.root, request)
    }

    pub fn summary(&self) -> Result<StoreSummary> {
        let documents = loader::load(&self.root, None)?;

        let mut counts: BTreeMap<String, usize> = AbilityType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        for doc in &documents {
            *counts.entry(doc.ability_type.as_str().to_string()).or_default() += 1;
        }

        Ok(StoreSummary {
            root: self.root.display().to_string(),
            total: documents.len(),
            counts,
            last_updated: documents.iter().filter_map(|doc| doc.updated_at).max(),
        })
    }
}

/// Create the root and the type folders.
pub fn ensure_layout(root: &Path) -> Result<()> {
    for folder in TYPE_FOLDERS {
        fs::create_dir_all(root.join(folder))?;
    }
    Ok(())
}

/// Write the bundled defaults, skipping files that already exist.
fn seed(root: &Path) -> Result<usize> {
    let mut written = 0;
    for doc in default_documents() {
        let path = root.join(doc.path);
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, doc.content)?;
        written += 1;
    }
    info!(root = %root.display(), count = written, "Seeded default ability documents");
    Ok(written)
}
