//! Command implementations for the abl CLI.
//!
//! Each command returns a result type implementing [`Output`] so `main` can
//! print it as JSON (default) or human-readable text.

use serde::Serialize;
use std::io::Read;
use std::path::Path;

use crate::abilities::{AbilityDocument, ResolutionRequest, ResolutionResult};
use crate::config::ResolvedConfig;
use crate::storage::{AbilityStore, StoreSummary, WriteRequest};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    fn to_json(&self) -> String;

    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

// === list ===

#[derive(Serialize)]
pub struct ListResult {
    pub count: usize,
    pub documents: Vec<AbilityDocument>,
}

impl Output for ListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.documents.is_empty() {
            return "No ability documents found.".to_string();
        }
        let mut lines = vec![format!("{} document(s):", self.count)];
        for doc in &self.documents {
            lines.push(format!("  {}", doc.summary()));
        }
        lines.join("\n")
    }
}

/// List documents, optionally filtered by type name.
pub fn list(store: &AbilityStore, ability_type: Option<&str>) -> Result<ListResult> {
    let documents = store.list_documents(ability_type)?;
    Ok(ListResult {
        count: documents.len(),
        documents,
    })
}

// === show ===

#[derive(Serialize)]
#[serde(transparent)]
pub struct ShowResult {
    pub document: AbilityDocument,
}

impl Output for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let doc = &self.document;
        let mut lines = vec![doc.summary(), format!("path: {}", doc.path)];
        if let Some(ref name) = doc.name {
            lines.push(format!("name: {}", name));
        }
        if !doc.aliases.is_empty() {
            lines.push(format!("aliases: {}", doc.aliases.join(", ")));
        }
        if !doc.includes.is_empty() {
            lines.push(format!("includes: {}", doc.includes.join(", ")));
        }
        if let Some(ref supersedes) = doc.supersedes {
            lines.push(format!("supersedes: {}", supersedes));
        }
        lines.push(String::new());
        lines.push(doc.body.clone());
        lines.join("\n")
    }
}

pub fn show(store: &AbilityStore, id: &str) -> Result<ShowResult> {
    Ok(ShowResult {
        document: store.get_document(id)?,
    })
}

// === resolve ===

pub struct ResolveResult {
    pub result: ResolutionResult,
    /// Print only the prompt.
    pub prompt_only: bool,
}

impl Output for ResolveResult {
    fn to_json(&self) -> String {
        if self.prompt_only {
            json(&serde_json::json!({ "prompt": self.result.prompt }))
        } else {
            json(&self.result)
        }
    }

    fn to_human(&self) -> String {
        if self.prompt_only {
            return self.result.prompt.clone();
        }

        let manifest = &self.result.manifest;
        let mut lines = vec![self.result.prompt.clone(), String::new(), "---".to_string()];
        lines.push(format!("persona: {}", manifest.applied.persona));
        if let Some(ref repo) = manifest.applied.repo {
            lines.push(format!("repo: {}", repo));
        }
        lines.push(format!("order: {}", manifest.order.join(", ")));
        lines.push(format!("hash: {}", manifest.hash));

        if let Some(ref trace) = self.result.trace {
            lines.push(String::new());
            lines.push("trace:".to_string());
            for row in trace {
                let mut line = format!(
                    "  {} [{}] priority {} {} ({:?})",
                    row.id, row.ability_type, row.priority, row.reason, row.outcome
                );
                if let Some(ref detail) = row.detail {
                    line.push_str(&format!(" {}", detail));
                }
                lines.push(line);
            }
        }
        lines.join("\n")
    }
}

pub fn resolve(
    store: &AbilityStore,
    request: &ResolutionRequest,
    prompt_only: bool,
) -> Result<ResolveResult> {
    Ok(ResolveResult {
        result: store.resolve(request)?,
        prompt_only,
    })
}

// === write ===

#[derive(Serialize)]
pub struct WriteResult {
    pub written: bool,
    pub document: AbilityDocument,
}

impl Output for WriteResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Wrote {} to {}", self.document.id, self.document.path)
    }
}

pub fn write(store: &AbilityStore, request: &WriteRequest) -> Result<WriteResult> {
    Ok(WriteResult {
        written: true,
        document: store.write_document(request)?,
    })
}

/// Body text from exactly one of inline content, a file, or stdin.
pub fn read_body(content: Option<String>, file: Option<&Path>, stdin: bool) -> Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    if let Some(file) = file {
        return Ok(std::fs::read_to_string(file)?);
    }
    if stdin {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        return Ok(body);
    }
    Err(Error::Config(
        "Document body is required (use -c, --file or --stdin)".to_string(),
    ))
}

// === summary ===

#[derive(Serialize)]
#[serde(transparent)]
pub struct SummaryResult {
    pub summary: StoreSummary,
}

impl Output for SummaryResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let summary = &self.summary;
        let mut lines = vec![
            format!("Store: {}", summary.root),
            format!("Documents: {}", summary.total),
        ];
        for (ability_type, count) in &summary.counts {
            lines.push(format!("  {}: {}", ability_type, count));
        }
        match summary.last_updated {
            Some(ts) => lines.push(format!("Last updated: {}", ts.to_rfc3339())),
            None => lines.push("Last updated: never".to_string()),
        }
        lines.join("\n")
    }
}

pub fn summary(store: &AbilityStore) -> Result<SummaryResult> {
    Ok(SummaryResult {
        summary: store.summary()?,
    })
}

// === config show ===

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub store_root: String,
    pub store_root_source: String,
    pub seed_defaults: bool,
    pub seed_defaults_source: String,
    pub output_format: String,
    pub output_format_source: String,
    pub config_path: Option<String>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("store-root: {} ({})", self.store_root, self.store_root_source),
            format!(
                "seed-defaults: {} ({})",
                self.seed_defaults, self.seed_defaults_source
            ),
            format!(
                "output-format: {} ({})",
                self.output_format, self.output_format_source
            ),
        ];
        if let Some(ref path) = self.config_path {
            lines.push(format!("config file: {}", path));
        }
        lines.join("\n")
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShowResult {
    ConfigShowResult {
        store_root: config.store_root().display().to_string(),
        store_root_source: config.store_root.source.to_string(),
        seed_defaults: config.seed_defaults(),
        seed_defaults_source: config.seed_defaults.source.to_string(),
        output_format: config.output_format().to_string(),
        output_format_source: config.output_format.source.to_string(),
        config_path: config
            .config_path
            .as_ref()
            .map(|p| p.display().to_string()),
    }
}
