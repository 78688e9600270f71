//! The closed 18-label CNER taxonomy.

use std::collections::HashSet;

use super::types::{AnnotatedRecord, Entity};

/// Every valid entity label, grouped as in the extraction prompt.
pub const CNER_LABELS: [&str; 18] = [
    "PER", "LOC", "ORG", "DATE", "NUM", // Core
    "ROLE", "EVENT", "LAW", "THEORY", "GROUP", // Sociopolitical
    "FOOD", "FIELD", "LANGUAGE", "ART", // Knowledge & culture
    "ARTIFACT", "SUBSTANCE", "DISEASE", "MONEY", // Physical world
];

/// Is `label` one of the 18 taxonomy labels? Exact, case-sensitive.
pub fn is_valid_label(label: &str) -> bool {
    CNER_LABELS.contains(&label)
}

/// A fixed label set used to validate oracle output.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    labels: HashSet<String>,
}

impl Taxonomy {
    /// The standard 18-label taxonomy.
    pub fn cner() -> Self {
        Self::from_labels(CNER_LABELS)
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Entities of `record` whose label is outside the taxonomy, in order.
    pub fn invalid_entities(&self, record: &AnnotatedRecord) -> Vec<Entity> {
        record
            .entities
            .iter()
            .filter(|e| !self.contains(&e.label))
            .cloned()
            .collect()
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::cner()
    }
}
