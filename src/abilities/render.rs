//! Prompt rendering and manifest construction.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::abilities::definitions::AbilityDocument;

/// Length of the manifest hash in hex characters.
pub const MANIFEST_HASH_LEN: usize = 16;

const PERSONA_TITLE: &str = "## Persona";
const REPO_TITLE: &str = "## Repo Constraints";
const RULES_TITLE: &str = "## Rules";
const POLICIES_TITLE: &str = "## Policies & Style";

/// Applied document ids by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAbilities {
    pub persona: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub rules: Vec<String>,
    pub policies: Vec<String>,
}

/// Audit record of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub applied: AppliedAbilities,
    /// Full selection order, persona and repo included.
    pub order: Vec<String>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub prompt: String,
    pub manifest: Manifest,
}

/// Render the prompt sections and build the manifest.
///
/// `rules` and `policies` must already be in selection order.
pub fn render(
    persona: &AbilityDocument,
    repo: Option<&AbilityDocument>,
    rules: &[&AbilityDocument],
    policies: &[&AbilityDocument],
    order: &[String],
) -> Rendered {
    let mut sections = Vec::new();
    sections.push(section(PERSONA_TITLE, &[persona]));
    if let Some(repo) = repo {
        sections.push(section(REPO_TITLE, &[repo]));
    }
    if !rules.is_empty() {
        sections.push(section(RULES_TITLE, rules));
    }
    if !policies.is_empty() {
        sections.push(section(POLICIES_TITLE, policies));
    }
    let prompt = sections.join("\n\n").trim().to_string();

    let rule_ids: Vec<String> = rules.iter().map(|doc| doc.id.clone()).collect();
    let hash = manifest_hash(&prompt, &rule_ids);

    Rendered {
        prompt,
        manifest: Manifest {
            applied: AppliedAbilities {
                persona: persona.id.clone(),
                repo: repo.map(|doc| doc.id.clone()),
                rules: rule_ids,
                policies: policies.iter().map(|doc| doc.id.clone()).collect(),
            },
            order: order.to_vec(),
            hash,
        },
    }
}

fn section(title: &str, docs: &[&AbilityDocument]) -> String {
    let blocks: Vec<String> = docs.iter().map(|doc| block(doc)).collect();
    format!("{}\n\n{}", title, blocks.join("\n\n"))
}

fn block(doc: &AbilityDocument) -> String {
    format!(
        "<!-- ability:{} priority:{} -->\n{}",
        doc.id,
        doc.priority,
        doc.body.trim()
    )
}

/// Short SHA-256 over the prompt and the ordered rule ids.
pub fn manifest_hash(prompt: &str, rule_ids: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(b"\n");
    hasher.update(rule_ids.join(",").as_bytes());
    let hash = hasher.finalize();
    format!("{:x}", hash)[..MANIFEST_HASH_LEN].to_string()
}
