//! In-memory catalog of loaded ability documents.

use std::collections::HashMap;

use tracing::debug;

use crate::abilities::definitions::{AbilityDocument, AbilityType};

/// Documents keyed by id.
///
/// Built from a path-sorted document list. When two documents share an id the
/// later one wins and takes the later position in iteration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    documents: Vec<AbilityDocument>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, keeping input order for the surviving documents.
    pub fn new(documents: Vec<AbilityDocument>) -> Self {
        let mut last_seen: HashMap<&str, usize> = HashMap::new();
        for (position, doc) in documents.iter().enumerate() {
            if let Some(previous) = last_seen.insert(doc.id.as_str(), position) {
                debug!(
                    id = %doc.id,
                    shadowed = %documents[previous].path,
                    winner = %doc.path,
                    "Duplicate ability id, later document wins"
                );
            }
        }
        let keep: Vec<bool> = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| last_seen.get(doc.id.as_str()) == Some(&position))
            .collect();

        let documents: Vec<AbilityDocument> = documents
            .into_iter()
            .zip(keep)
            .filter_map(|(doc, keep)| keep.then_some(doc))
            .collect();
        let index = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| (doc.id.clone(), position))
            .collect();

        Self { documents, index }
    }

    pub fn get(&self, id: &str) -> Option<&AbilityDocument> {
        self.index.get(id).map(|&position| &self.documents[position])
    }

    /// All documents in catalog order.
    pub fn documents(&self) -> &[AbilityDocument] {
        &self.documents
    }

    pub fn of_type(&self, ability_type: AbilityType) -> impl Iterator<Item = &AbilityDocument> {
        self.documents
            .iter()
            .filter(move |doc| doc.ability_type == ability_type)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

impl FromIterator<AbilityDocument> for Catalog {
    fn from_iter<I: IntoIterator<Item = AbilityDocument>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
