//! Bundled default documents.
//!
//! These are compiled into the `abl` binary and written into a freshly created
//! store so a first `abl resolve engineer` has something to work with:
//! - **persona.engineer** / **persona.reviewer**: starter personas
//! - **rule.core.communication**: included by both personas
//! - **rule.backend.base**, **rule.frontend.base**: tag-matched rules
//! - **policy.security**, **style.concise**: policy-class documents
//! - **repo.example-service**: sample repository constraints

/// A default document and its path relative to the store root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedDocument {
    pub path: &'static str,
    pub content: &'static str,
}

const DEFAULTS: &[EmbeddedDocument] = &[
    EmbeddedDocument {
        path: "personas/engineer.md",
        content: include_str!("embedded/personas/engineer.md"),
    },
    EmbeddedDocument {
        path: "personas/reviewer.md",
        content: include_str!("embedded/personas/reviewer.md"),
    },
    EmbeddedDocument {
        path: "rules/core/communication.md",
        content: include_str!("embedded/rules/core/communication.md"),
    },
    EmbeddedDocument {
        path: "rules/backend/base.md",
        content: include_str!("embedded/rules/backend/base.md"),
    },
    EmbeddedDocument {
        path: "rules/frontend/base.md",
        content: include_str!("embedded/rules/frontend/base.md"),
    },
    EmbeddedDocument {
        path: "policies/security.md",
        content: include_str!("embedded/policies/security.md"),
    },
    EmbeddedDocument {
        path: "policies/style/concise.md",
        content: include_str!("embedded/policies/style/concise.md"),
    },
    EmbeddedDocument {
        path: "repos/example-service.md",
        content: include_str!("embedded/repos/example-service.md"),
    },
];

/// The bundled default documents in path order.
pub fn default_documents() -> &'static [EmbeddedDocument] {
    DEFAULTS
}
