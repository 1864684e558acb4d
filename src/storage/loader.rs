//! Loading ability documents from the store tree.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::Result;
use crate::abilities::definitions::{
    AbilityDocument, AbilityType, DEFAULT_PRIORITY, DOCUMENT_EXTENSION, TYPE_FOLDERS,
};
use crate::abilities::frontmatter::{FieldValue, Frontmatter, parse};

/// Load documents under `root`, sorted by relative path.
///
/// With a type filter only that type's folder is walked and only documents
/// of that type are kept. Missing folders contribute nothing.
pub fn load(root: &Path, type_filter: Option<AbilityType>) -> Result<Vec<AbilityDocument>> {
    let folders: Vec<&str> = match type_filter {
        Some(ability_type) => vec![ability_type.folder()],
        None => TYPE_FOLDERS.to_vec(),
    };

    let mut documents = Vec::new();
    for folder in folders {
        let Some(folder_type) = AbilityType::from_folder(folder) else {
            continue;
        };
        let dir = root.join(folder);
        if !dir.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!(path = %path, error = %e, "Skipping unreadable store entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_document_extension(entry.path()) {
                continue;
            }
            let doc = match load_file(root, entry.path(), folder_type) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable ability document");
                    continue;
                }
            };
            if type_filter.is_none_or(|wanted| wanted == doc.ability_type) {
                documents.push(doc);
            }
        }
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %root.display(), count = documents.len(), "Loaded ability documents");
    Ok(documents)
}

/// Load a single document file found under the folder for `folder_type`.
pub fn load_file(root: &Path, path: &Path, folder_type: AbilityType) -> Result<AbilityDocument> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let updated_at = fs::metadata(path)?
        .modified()
        .ok()
        .map(DateTime::<Utc>::from);

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(build_document(
        parse(&text),
        folder_type,
        &stem,
        relative_path(root, path),
        updated_at,
    ))
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}

/// Path relative to `root` with `/` separators.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize parsed header fields into a document.
pub fn build_document(
    frontmatter: Frontmatter,
    folder_type: AbilityType,
    stem: &str,
    path: String,
    updated_at: Option<DateTime<Utc>>,
) -> AbilityDocument {
    let ability_type = match frontmatter.get("type").and_then(FieldValue::as_scalar) {
        Some(declared) => match declared.parse::<AbilityType>() {
            Ok(ability_type) => ability_type,
            Err(_) => {
                debug!(path = %path, declared = %declared, "Ignoring unknown header type");
                folder_type
            }
        },
        None => folder_type,
    };

    let id = scalar(&frontmatter, "id").unwrap_or_else(|| format!("{}.{}", ability_type, stem));
    let list = |key: &str| {
        frontmatter
            .get(key)
            .map(FieldValue::as_list)
            .unwrap_or_default()
    };

    let mut doc = AbilityDocument::new(id, ability_type, frontmatter.body.as_str())
        .with_tags(list("tags"))
        .with_includes(list("includes"))
        .with_aliases(list("aliases"))
        .with_priority(coerce_priority(frontmatter.get("priority")))
        .with_path(path);
    doc.name = scalar(&frontmatter, "name");
    doc.supersedes = scalar(&frontmatter, "supersedes");
    doc.deprecated = frontmatter.get("deprecated").and_then(FieldValue::as_bool) == Some(true);
    doc.updated_at = updated_at;
    doc
}

fn scalar(frontmatter: &Frontmatter, key: &str) -> Option<String> {
    frontmatter
        .get(key)
        .and_then(FieldValue::as_scalar)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Integers are taken as-is; numeric strings are truncated; anything else
/// falls back to the default priority.
pub fn coerce_priority(value: Option<&FieldValue>) -> i64 {
    match value {
        Some(FieldValue::Integer(priority)) => *priority,
        Some(FieldValue::String(raw)) => match raw.trim().parse::<f64>() {
            Ok(priority) if priority.is_finite() => priority.trunc() as i64,
            _ => DEFAULT_PRIORITY,
        },
        _ => DEFAULT_PRIORITY,
    }
}
