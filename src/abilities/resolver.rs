//! Resolution of a persona request into an ordered ability selection.
//!
//! The resolver is a pure function over a [`Catalog`]: it never touches the
//! filesystem, so identical catalogs and requests always yield identical
//! prompts and manifest hashes.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abilities::catalog::Catalog;
use crate::abilities::definitions::{AbilityDocument, AbilityType};
use crate::abilities::render::{Manifest, render};
use crate::{Error, Result};

const REASON_PERSONA: &str = "persona";
const REASON_TAG_MATCH: &str = "tag-match";

/// A resolution request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    /// Persona id, prefixed id, slug, or alias.
    pub persona: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "repoId", skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    /// Record a trace row per selection attempt.
    #[serde(default)]
    pub trace: bool,
}

impl ResolutionRequest {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
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

    pub fn with_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = Some(repo_id.into());
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// What an add attempt did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOutcome {
    /// The id was not selected yet.
    Added,
    /// The attempt displaced the incumbent entry.
    Replaced,
    /// The incumbent entry stayed.
    Kept,
}

/// One add attempt during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub ability_type: AbilityType,
    pub priority: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub outcome: TraceOutcome,
}

/// A document in the final ordered selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAbility {
    pub id: String,
    #[serde(rename = "type")]
    pub ability_type: AbilityType,
    pub priority: i64,
    pub reason: String,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub prompt: String,
    pub manifest: Manifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
    pub persona_body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_body: Option<String>,
    pub rule_bodies: Vec<String>,
    pub policy_bodies: Vec<String>,
    pub selection: Vec<SelectedAbility>,
}

struct SelectionEntry<'a> {
    doc: &'a AbilityDocument,
    reason: String,
}

/// Selection map keyed by id with the priority override rule.
struct Selection<'a> {
    catalog: &'a Catalog,
    entries: HashMap<&'a str, SelectionEntry<'a>>,
    trace: Option<Vec<TraceEntry>>,
}

impl<'a> Selection<'a> {
    fn new(catalog: &'a Catalog, trace: bool) -> Self {
        Self {
            catalog,
            entries: HashMap::new(),
            trace: trace.then(Vec::new),
        }
    }

    /// Insert `doc`, or replace the incumbent when `doc` has strictly higher
    /// priority, or equal priority and a smaller id.
    fn add(&mut self, doc: &'a AbilityDocument, reason: String, detail: Option<String>) {
        let outcome = match self.entries.entry(doc.id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(SelectionEntry {
                    doc,
                    reason: reason.clone(),
                });
                TraceOutcome::Added
            }
            Entry::Occupied(mut slot) => {
                let incumbent = slot.get().doc;
                let wins = doc.priority > incumbent.priority
                    || (doc.priority == incumbent.priority && doc.id < incumbent.id);
                if wins {
                    slot.insert(SelectionEntry {
                        doc,
                        reason: reason.clone(),
                    });
                    TraceOutcome::Replaced
                } else {
                    TraceOutcome::Kept
                }
            }
        };

        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry {
                id: doc.id.clone(),
                ability_type: doc.ability_type,
                priority: doc.priority,
                reason,
                detail,
                outcome,
            });
        }
    }

    /// Add everything `doc` includes, transitively.
    ///
    /// `visiting` holds the ids on the current include path only, so a
    /// document reached along two paths is added twice (harmlessly) while a
    /// document including one of its ancestors stops the descent.
    fn expand_includes(&mut self, doc: &'a AbilityDocument, visiting: &mut HashSet<&'a str>) {
        if !visiting.insert(doc.id.as_str()) {
            return;
        }

        let catalog = self.catalog;
        for include in &doc.includes {
            match catalog.get(include) {
                Some(child) => {
                    self.add(child, format!("include:{}", doc.id), None);
                    self.expand_includes(child, visiting);
                }
                None => debug!(parent = %doc.id, include = %include, "Skipping unknown include"),
            }
        }

        visiting.remove(doc.id.as_str());
    }

    /// Entries sorted by priority (desc), type rank, then id.
    fn finish(self) -> (Vec<SelectionEntry<'a>>, Option<Vec<TraceEntry>>) {
        let mut ordered: Vec<SelectionEntry<'a>> = self.entries.into_values().collect();
        ordered.sort_by(|a, b| {
            b.doc
                .priority
                .cmp(&a.doc.priority)
                .then_with(|| a.doc.ability_type.rank().cmp(&b.doc.ability_type.rank()))
                .then_with(|| a.doc.id.cmp(&b.doc.id))
        });
        (ordered, self.trace)
    }
}

/// Lower-case, collapse runs of non-alphanumerics to `-`, trim `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Find a persona by id, `persona.`-prefixed id, slug, or alias.
pub fn find_persona<'a>(catalog: &'a Catalog, input: &str) -> Option<&'a AbilityDocument> {
    find_document(catalog, AbilityType::Persona, input, false)
}

/// Find a repo by id, `repo.`-prefixed id, slug, name, or alias.
pub fn find_repo<'a>(catalog: &'a Catalog, input: &str) -> Option<&'a AbilityDocument> {
    find_document(catalog, AbilityType::Repo, input, true)
}

fn find_document<'a>(
    catalog: &'a Catalog,
    ability_type: AbilityType,
    input: &str,
    match_name: bool,
) -> Option<&'a AbilityDocument> {
    let wanted = input.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let prefix = format!("{}.", ability_type.as_str());

    if let Some(doc) = catalog
        .of_type(ability_type)
        .find(|doc| doc.id.to_lowercase() == wanted)
    {
        return Some(doc);
    }

    if !wanted.starts_with(&prefix) {
        let prefixed = format!("{}{}", prefix, wanted);
        if let Some(doc) = catalog
            .of_type(ability_type)
            .find(|doc| doc.id.to_lowercase() == prefixed)
        {
            return Some(doc);
        }
    }

    let target = slugify(wanted.strip_prefix(&prefix).unwrap_or(&wanted));
    if target.is_empty() {
        return None;
    }
    catalog.of_type(ability_type).find(|doc| {
        let id = doc.id.to_lowercase();
        slugify(id.strip_prefix(&prefix).unwrap_or(&id)) == target
            || doc.aliases.iter().any(|alias| slugify(alias) == target)
            || (match_name && doc.name.as_deref().is_some_and(|name| slugify(name) == target))
    })
}

/// Resolve `request` against `catalog`.
///
/// Returns `Error::NotFound` when no persona matches. An unmatched or blank
/// repo id resolves without repo context.
pub fn resolve(catalog: &Catalog, request: &ResolutionRequest) -> Result<ResolutionResult> {
    let persona = find_persona(catalog, &request.persona).ok_or_else(|| {
        Error::NotFound(format!("No persona matches '{}'", request.persona.trim()))
    })?;

    let repo = match request.repo_id.as_deref().map(str::trim) {
        Some(repo_id) if !repo_id.is_empty() => {
            let found = find_repo(catalog, repo_id);
            if found.is_none() {
                debug!(repo = %repo_id, "No repo matches, resolving without repo context");
            }
            found
        }
        _ => None,
    };

    let mut selection = Selection::new(catalog, request.trace);

    selection.add(persona, REASON_PERSONA.to_string(), None);
    selection.expand_includes(persona, &mut HashSet::new());

    if let Some(repo) = repo {
        selection.add(repo, format!("repo:{}", repo.id), None);
        selection.expand_includes(repo, &mut HashSet::new());
    }

    let effective: BTreeSet<String> = request
        .tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .chain(repo.into_iter().flat_map(|doc| doc.tags.iter().cloned()))
        .collect();

    if !effective.is_empty() {
        let effective_list = effective.iter().cloned().collect::<Vec<_>>().join(", ");
        for doc in catalog
            .documents()
            .iter()
            .filter(|doc| doc.ability_type.is_tag_matched())
        {
            if let Some(tag) = doc.matching_tag(&effective) {
                let detail = format!("tag={}; effective=[{}]", tag, effective_list);
                selection.add(doc, REASON_TAG_MATCH.to_string(), Some(detail));
                selection.expand_includes(doc, &mut HashSet::new());
            }
        }
    }

    let (ordered, trace) = selection.finish();

    let repo_id = repo.map(|doc| doc.id.as_str());
    let sectioned = ordered
        .iter()
        .map(|entry| entry.doc)
        .filter(|doc| doc.id != persona.id && Some(doc.id.as_str()) != repo_id);
    let rules: Vec<&AbilityDocument> = sectioned
        .clone()
        .filter(|doc| doc.ability_type == AbilityType::Rule)
        .collect();
    let policies: Vec<&AbilityDocument> = sectioned
        .filter(|doc| doc.ability_type.is_policy_class())
        .collect();

    let order: Vec<String> = ordered.iter().map(|entry| entry.doc.id.clone()).collect();
    let rendered = render(persona, repo, &rules, &policies, &order);

    debug!(
        persona = %persona.id,
        selected = ordered.len(),
        rules = rules.len(),
        policies = policies.len(),
        hash = %rendered.manifest.hash,
        "Resolved abilities"
    );

    Ok(ResolutionResult {
        prompt: rendered.prompt,
        manifest: rendered.manifest,
        trace,
        persona_body: persona.body.clone(),
        repo_body: repo.map(|doc| doc.body.clone()),
        rule_bodies: rules.iter().map(|doc| doc.body.clone()).collect(),
        policy_bodies: policies.iter().map(|doc| doc.body.clone()).collect(),
        selection: ordered
            .iter()
            .map(|entry| SelectedAbility {
                id: entry.doc.id.clone(),
                ability_type: entry.doc.ability_type,
                priority: entry.doc.priority,
                reason: entry.reason.clone(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(id: &str) -> AbilityDocument {
        AbilityDocument::new(id, AbilityType::Persona, format!("{} body", id))
    }

    fn rule(id: &str) -> AbilityDocument {
        AbilityDocument::new(id, AbilityType::Rule, format!("{} body", id))
    }

    fn engineer_catalog() -> Catalog {
        Catalog::new(vec![
            persona("persona.engineer"),
            rule("rule.backend.base").with_tags(["backend"]),
        ])
    }

    #[test]
    fn test_engineer_backend_scenario() {
        let catalog = engineer_catalog();
        let request = ResolutionRequest::new("engineer").with_tags(["backend"]);
        let result = resolve(&catalog, &request).unwrap();

        assert_eq!(result.manifest.applied.persona, "persona.engineer");
        assert_eq!(result.manifest.applied.rules, vec!["rule.backend.base"]);
        assert!(result.manifest.applied.policies.is_empty());
        assert_eq!(
            result.manifest.order,
            vec!["persona.engineer", "rule.backend.base"]
        );
        assert_eq!(result.persona_body, "persona.engineer body");
        assert_eq!(result.rule_bodies, vec!["rule.backend.base body"]);
        assert!(result.trace.is_none());
    }

    #[test]
    fn test_unknown_persona_is_not_found() {
        let catalog = engineer_catalog();
        let err = resolve(&catalog, &ResolutionRequest::new("nonexistent")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_blank_persona_is_not_found() {
        let catalog = engineer_catalog();
        let err = resolve(&catalog, &ResolutionRequest::new("  ")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_determinism() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["rule.c"]),
            rule("rule.a").with_tags(["backend"]),
            rule("rule.b").with_tags(["backend"]).with_priority(150),
            rule("rule.c"),
        ]);
        let request = ResolutionRequest::new("engineer").with_tags(["backend"]);
        let first = resolve(&catalog, &request).unwrap();
        for _ in 0..10 {
            let again = resolve(&catalog, &request).unwrap();
            assert_eq!(again.prompt, first.prompt);
            assert_eq!(again.manifest, first.manifest);
        }
    }

    #[test]
    fn test_higher_priority_comes_first() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer"),
            rule("rule.a").with_tags(["backend"]).with_priority(100),
            rule("rule.z").with_tags(["backend"]).with_priority(120),
        ]);
        let request = ResolutionRequest::new("engineer").with_tags(["backend"]);
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(result.manifest.applied.rules, vec!["rule.z", "rule.a"]);
        assert_eq!(
            result.manifest.order,
            vec!["rule.z", "persona.engineer", "rule.a"]
        );
    }

    #[test]
    fn test_equal_priority_orders_by_id() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer"),
            rule("rule.m").with_tags(["backend"]),
            rule("rule.b").with_tags(["backend"]),
        ]);
        let request = ResolutionRequest::new("engineer").with_tags(["backend"]);
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(result.manifest.applied.rules, vec!["rule.b", "rule.m"]);
    }

    #[test]
    fn test_type_rank_breaks_priority_ties() {
        let catalog = Catalog::new(vec![
            persona("persona.z"),
            AbilityDocument::new("a.policy", AbilityType::Policy, "p").with_tags(["x"]),
            rule("b.rule").with_tags(["x"]),
            AbilityDocument::new("repo.svc", AbilityType::Repo, "r"),
        ]);
        let request = ResolutionRequest::new("z").with_tags(["x"]).with_repo("svc");
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(
            result.manifest.order,
            vec!["persona.z", "repo.svc", "b.rule", "a.policy"]
        );
    }

    #[test]
    fn test_include_cycle_terminates() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["rule.a"]),
            rule("rule.a").with_includes(["rule.b"]),
            rule("rule.b").with_includes(["rule.a"]),
        ]);
        let result = resolve(&catalog, &ResolutionRequest::new("engineer")).unwrap();
        assert_eq!(result.manifest.applied.rules, vec!["rule.a", "rule.b"]);
        assert_eq!(result.manifest.order.len(), 3);
    }

    #[test]
    fn test_self_include_terminates() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["persona.engineer"]),
        ]);
        let result = resolve(&catalog, &ResolutionRequest::new("engineer")).unwrap();
        assert_eq!(result.manifest.order, vec!["persona.engineer"]);
    }

    #[test]
    fn test_diamond_include_adds_once() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["rule.a", "rule.b"]),
            rule("rule.a").with_includes(["rule.c"]),
            rule("rule.b").with_includes(["rule.c"]),
            rule("rule.c"),
        ]);
        let request = ResolutionRequest::new("engineer").with_trace(true);
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(
            result.manifest.applied.rules,
            vec!["rule.a", "rule.b", "rule.c"]
        );

        let trace = result.trace.unwrap();
        let c_rows: Vec<&TraceEntry> = trace.iter().filter(|row| row.id == "rule.c").collect();
        assert_eq!(c_rows.len(), 2);
        assert_eq!(c_rows[0].outcome, TraceOutcome::Added);
        assert_eq!(c_rows[0].reason, "include:rule.a");
        assert_eq!(c_rows[1].outcome, TraceOutcome::Kept);
        assert_eq!(c_rows[1].reason, "include:rule.b");

        let c = result.selection.iter().find(|s| s.id == "rule.c").unwrap();
        assert_eq!(c.reason, "include:rule.a");
    }

    #[test]
    fn test_tag_union_with_repo_tags() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer"),
            rule("rule.backend").with_tags(["backend"]),
            rule("rule.python").with_tags(["python"]),
            rule("rule.frontend").with_tags(["frontend"]),
            AbilityDocument::new("repo.svc", AbilityType::Repo, "r").with_tags(["python"]),
        ]);
        let request = ResolutionRequest::new("engineer")
            .with_tags(["Backend"])
            .with_repo("svc");
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(result.manifest.applied.repo.as_deref(), Some("repo.svc"));
        assert_eq!(
            result.manifest.applied.rules,
            vec!["rule.backend", "rule.python"]
        );
        assert_eq!(result.repo_body.as_deref(), Some("r"));
    }

    #[test]
    fn test_unknown_include_is_ignored() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["rule.missing", "rule.real"]),
            rule("rule.real"),
        ]);
        let result = resolve(&catalog, &ResolutionRequest::new("engineer")).unwrap();
        assert_eq!(result.manifest.applied.rules, vec!["rule.real"]);
        assert!(!result.manifest.order.contains(&"rule.missing".to_string()));
    }

    #[test]
    fn test_style_and_policy_share_section() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer"),
            AbilityDocument::new("policy.sec", AbilityType::Policy, "p")
                .with_tags(["x"])
                .with_priority(110),
            AbilityDocument::new("style.brief", AbilityType::Style, "s").with_tags(["x"]),
        ]);
        let request = ResolutionRequest::new("engineer").with_tags(["x"]);
        let result = resolve(&catalog, &request).unwrap();
        assert_eq!(
            result.manifest.applied.policies,
            vec!["policy.sec", "style.brief"]
        );
        assert_eq!(result.policy_bodies, vec!["p", "s"]);
    }

    #[test]
    fn test_included_persona_is_not_sectioned() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer").with_includes(["persona.base"]),
            persona("persona.base"),
        ]);
        let result = resolve(&catalog, &ResolutionRequest::new("engineer")).unwrap();
        assert_eq!(result.manifest.order, vec!["persona.base", "persona.engineer"]);
        assert!(result.manifest.applied.rules.is_empty());
        assert!(result.manifest.applied.policies.is_empty());
    }

    #[test]
    fn test_trace_records_tag_detail() {
        let catalog = Catalog::new(vec![
            persona("persona.engineer"),
            rule("rule.backend.base").with_tags(["backend", "api"]),
        ]);
        let request = ResolutionRequest::new("engineer")
            .with_tags(["backend", "api"])
            .with_trace(true);
        let trace = resolve(&catalog, &request).unwrap().trace.unwrap();

        assert_eq!(trace[0].reason, "persona");
        assert_eq!(trace[0].outcome, TraceOutcome::Added);
        assert_eq!(trace[1].reason, "tag-match");
        assert_eq!(
            trace[1].detail.as_deref(),
            Some("tag=api; effective=[api, backend]")
        );
    }

    #[test]
    fn test_persona_lookup_forms() {
        let catalog = Catalog::new(vec![
            persona("persona.senior-engineer").with_aliases(["SeniorDev"]),
            persona("persona.other"),
        ]);
        let ids = |input: &str| find_persona(&catalog, input).map(|doc| doc.id.clone());

        assert_eq!(ids("PERSONA.SENIOR-ENGINEER").as_deref(), Some("persona.senior-engineer"));
        assert_eq!(ids("senior-engineer").as_deref(), Some("persona.senior-engineer"));
        assert_eq!(ids("Senior Engineer").as_deref(), Some("persona.senior-engineer"));
        assert_eq!(ids("persona.senior_engineer").as_deref(), Some("persona.senior-engineer"));
        assert_eq!(ids("seniordev").as_deref(), Some("persona.senior-engineer"));
        assert_eq!(ids("nobody"), None);
    }

    #[test]
    fn test_persona_lookup_ignores_other_types() {
        let catalog = Catalog::new(vec![rule("rule.engineer"), persona("persona.x")]);
        assert!(find_persona(&catalog, "engineer").is_none());
    }

    #[test]
    fn test_repo_lookup_by_name_and_alias() {
        let catalog = Catalog::new(vec![
            AbilityDocument::new("repo.example-service", AbilityType::Repo, "r")
                .with_name("Example Service")
                .with_aliases(["svc"]),
        ]);
        for input in ["repo.example-service", "example-service", "Example Service", "SVC"] {
            assert!(find_repo(&catalog, input).is_some(), "{}", input);
        }
        assert!(find_repo(&catalog, "other").is_none());
    }

    #[test]
    fn test_unmatched_or_blank_repo_is_absent() {
        let catalog = engineer_catalog();
        for repo in ["missing", "   "] {
            let request = ResolutionRequest::new("engineer").with_repo(repo);
            let result = resolve(&catalog, &request).unwrap();
            assert!(result.manifest.applied.repo.is_none());
            assert!(result.repo_body.is_none());
        }
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: ResolutionRequest =
            serde_json::from_str(r#"{"persona": "engineer", "repoId": "svc"}"#).unwrap();
        assert_eq!(request.persona, "engineer");
        assert!(request.tags.is_empty());
        assert_eq!(request.repo_id.as_deref(), Some("svc"));
        assert!(!request.trace);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Example Service!"), "example-service");
        assert_eq!(slugify("--a__b--"), "a-b");
        assert_eq!(slugify("backend.base"), "backend-base");
        assert_eq!(slugify("!!!"), "");
    }
}
