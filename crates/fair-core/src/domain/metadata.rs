//! Canonical metadata model.
//!
//! Every connector normalizes its repository's native metadata into a
//! [`CanonicalMetadataRecord`]: an ordered list of
//! `(schema, element, qualifier, value)` statements.

use serde::{Deserialize, Serialize};

/// Schemas whose element vocabularies are recognised as formal and shared.
pub const KNOWN_SCHEMAS: [&str; 4] = ["dc", "dcterms", "datacite", "oai_dc"];

/// A single normalized metadata statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataStatement {
    pub schema: String,
    pub element: String,
    pub qualifier: Option<String>,
    pub value: String,
}

impl MetadataStatement {
    pub fn new(
        schema: impl Into<String>,
        element: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            element: element.into(),
            qualifier: None,
            value: value.into(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// Ordered metadata statements for one item.
///
/// Built by a connector and then shared read-only with every indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadataRecord {
    statements: Vec<MetadataStatement>,
}

impl CanonicalMetadataRecord {
    pub fn new(statements: Vec<MetadataStatement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[MetadataStatement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Statements whose element matches `element` (case-insensitive), any schema.
    pub fn by_element<'a>(
        &'a self,
        element: &'a str,
    ) -> impl Iterator<Item = &'a MetadataStatement> + 'a {
        self.statements
            .iter()
            .filter(move |s| s.element.eq_ignore_ascii_case(element))
    }

    /// Whether at least one non-blank statement exists for `element`.
    pub fn has_term(&self, element: &str) -> bool {
        self.by_element(element).any(|s| !s.value.trim().is_empty())
    }

    /// Values of all statements for `element`, in record order.
    pub fn values<'a>(&'a self, element: &'a str) -> Vec<&'a str> {
        self.by_element(element).map(|s| s.value.as_str()).collect()
    }

    /// Terms from `terms` that have no non-blank statement.
    pub fn missing_terms<'t>(&self, terms: &[&'t str]) -> Vec<&'t str> {
        terms
            .iter()
            .copied()
            .filter(|t| !self.has_term(t))
            .collect()
    }

    /// Distinct schemas used by the record, sorted.
    pub fn schemas(&self) -> Vec<&str> {
        let mut schemas: Vec<&str> = self.statements.iter().map(|s| s.schema.as_str()).collect();
        schemas.sort_unstable();
        schemas.dedup();
        schemas
    }
}

impl FromIterator<MetadataStatement> for CanonicalMetadataRecord {
    fn from_iter<I: IntoIterator<Item = MetadataStatement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
