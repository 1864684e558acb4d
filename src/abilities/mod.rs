//! Ability documents and prompt resolution.
//!
//! An ability document is a small markdown file with an optional `---`
//! delimited header. Documents come in five types:
//!
//! | Type    | Folder      | Role                                         |
//! |---------|-------------|----------------------------------------------|
//! | persona | personas/   | Root of every resolution, always included    |
//! | repo    | repos/      | Repository constraints, selected by repo id  |
//! | rule    | rules/      | Behavioral rules, selected by tag or include |
//! | policy  | policies/   | Policy statements, selected by tag/include   |
//! | style   | policies/   | Style statements, treated like policy        |
//!
//! ## Resolution
//!
//! 1. The persona (and optional repo) document is looked up by id, prefixed
//!    id, slug, or alias.
//! 2. `includes` edges are expanded transitively, with cycles cut per
//!    traversal path.
//! 3. Rule, policy and style documents whose tags intersect the effective tag
//!    set (request tags plus repo tags) are added.
//! 4. The selection is ordered by priority (desc), type rank, then id.
//! 5. The renderer builds the prompt and a manifest with a content hash.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use abl::abilities::{resolve, Catalog, ResolutionRequest};
//!
//! let catalog = store.catalog()?;
//! let request = ResolutionRequest::new("engineer").with_tags(["backend"]);
//! let result = resolve(&catalog, &request)?;
//! println!("{}", result.prompt);
//! println!("hash: {}", result.manifest.hash);
//! ```

pub mod catalog;
pub mod definitions;
pub mod embedded;
pub mod frontmatter;
pub mod render;
pub mod resolver;

pub use catalog::Catalog;
pub use definitions::{
    AbilityDocument, AbilityType, DEFAULT_PRIORITY, DOCUMENT_EXTENSION, TYPE_FOLDERS,
};
pub use embedded::{EmbeddedDocument, default_documents};
pub use frontmatter::{FieldValue, Frontmatter, parse};
pub use render::{AppliedAbilities, MANIFEST_HASH_LEN, Manifest, Rendered, render};
pub use resolver::{
    ResolutionRequest, ResolutionResult, SelectedAbility, TraceEntry, TraceOutcome,
    find_persona, find_repo, resolve, slugify,
};
