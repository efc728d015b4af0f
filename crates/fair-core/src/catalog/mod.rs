//! Indicator test catalog.
//!
//! The catalog is the ordered list of indicators every evaluation scores,
//! together with a generic default body per code. Connectors override
//! bodies through their own [`IndicatorTable`]; codes without either an
//! override or a generic body score as "not implemented".

pub mod generic;

use std::collections::HashSet;
use std::sync::Arc;

use crate::connector::{handler, IndicatorHandler, IndicatorTable};
use crate::domain::{CatalogError, IndicatorDefinition, IndicatorOutcome, Principle, Weight};

use crate::domain::Principle::{Accessible as A, Findable as F, Interoperable as I, Reusable as R};

/// RDA FAIR Data Maturity Model indicators: code, principle, priority, name.
///
/// Priority maps to weight: essential 3, important 2, useful 1.
const STANDARD_INDICATORS: &[(&str, Principle, u8, &str)] = &[
    ("rda_f1_01m", F, 3, "Metadata is identified by a persistent identifier"),
    ("rda_f1_01d", F, 3, "Data is identified by a persistent identifier"),
    ("rda_f1_02m", F, 3, "Metadata is identified by a globally unique identifier"),
    ("rda_f1_02d", F, 3, "Data is identified by a globally unique identifier"),
    ("rda_f2_01m", F, 3, "Rich metadata is provided to allow discovery"),
    ("rda_f3_01m", F, 3, "Metadata includes the identifier for the data"),
    ("rda_f4_01m", F, 3, "Metadata is offered in such a way that it can be harvested and indexed"),
    ("rda_a1_01m", A, 2, "Metadata contains information to enable the user to get access to the data"),
    ("rda_a1_02m", A, 3, "Metadata can be accessed manually"),
    ("rda_a1_02d", A, 3, "Data can be accessed manually"),
    ("rda_a1_03m", A, 3, "Metadata identifier resolves to a metadata record"),
    ("rda_a1_03d", A, 3, "Data identifier resolves to a digital object"),
    ("rda_a1_04m", A, 3, "Metadata is accessed through standardised protocol"),
    ("rda_a1_04d", A, 3, "Data is accessible through standardised protocol"),
    ("rda_a1_05d", A, 2, "Data can be accessed automatically"),
    ("rda_a1_1_01m", A, 3, "Metadata is accessible through a free access protocol"),
    ("rda_a1_1_01d", A, 2, "Data is accessible through a free access protocol"),
    ("rda_a1_2_01d", A, 1, "Data is accessible through an access protocol that supports authentication and authorisation"),
    ("rda_a2_01m", A, 3, "Metadata is guaranteed to remain available after data is no longer available"),
    ("rda_i1_01m", I, 2, "Metadata uses knowledge representation expressed in standardised format"),
    ("rda_i1_01d", I, 2, "Data uses knowledge representation expressed in standardised format"),
    ("rda_i1_02m", I, 2, "Metadata uses machine-understandable knowledge representation"),
    ("rda_i1_02d", I, 2, "Data uses machine-understandable knowledge representation"),
    ("rda_i2_01m", I, 2, "Metadata uses FAIR-compliant vocabularies"),
    ("rda_i2_01d", I, 1, "Data uses FAIR-compliant vocabularies"),
    ("rda_i3_01m", I, 2, "Metadata includes references to other metadata"),
    ("rda_i3_02m", I, 1, "Metadata includes references to other data"),
    ("rda_i3_02d", I, 1, "Data includes qualified references to other data"),
    ("rda_i3_03m", I, 2, "Metadata includes qualified references to other metadata"),
    ("rda_i3_04m", I, 1, "Metadata include qualified references to other data"),
    ("rda_r1_01m", R, 3, "Plurality of accurate and relevant attributes are provided to allow reuse"),
    ("rda_r1_1_01m", R, 3, "Metadata includes information about the licence under which the data can be reused"),
    ("rda_r1_1_02m", R, 2, "Metadata refers to a standard reuse licence"),
    ("rda_r1_1_03m", R, 2, "Metadata refers to a machine-understandable reuse licence"),
    ("rda_r1_2_01m", R, 2, "Metadata includes provenance information according to community-specific standards"),
    ("rda_r1_2_02m", R, 1, "Metadata includes provenance information according to a cross-community language"),
    ("rda_r1_3_01m", R, 3, "Metadata complies with a community standard"),
    ("rda_r1_3_01d", R, 3, "Data complies with a community standard"),
    ("rda_r1_3_02m", R, 3, "Metadata is expressed in compliance with a machine-understandable community standard"),
    ("rda_r1_3_02d", R, 2, "Data is expressed in compliance with a machine-understandable community standard"),
];

/// Definitions of the standard catalog, in report order.
pub fn standard_definitions() -> Vec<IndicatorDefinition> {
    STANDARD_INDICATORS
        .iter()
        .map(|&(code, principle, weight, name)| {
            // STANDARD_INDICATORS only holds weights 1..=3
            let weight = Weight::new(weight).unwrap_or(Weight::USEFUL);
            IndicatorDefinition::new(code, principle, weight, name)
        })
        .collect()
}

/// Immutable, shared list of indicators plus their generic bodies.
#[derive(Debug, Clone)]
pub struct IndicatorCatalog {
    definitions: Arc<[IndicatorDefinition]>,
    defaults: IndicatorTable,
}

impl IndicatorCatalog {
    /// The RDA catalog with the generic default bodies.
    pub fn standard() -> Self {
        Self {
            definitions: standard_definitions().into(),
            defaults: generic::default_table(),
        }
    }

    /// Build a catalog from custom definitions; codes must be unique.
    pub fn from_definitions(definitions: Vec<IndicatorDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for definition in &definitions {
            if !seen.insert(definition.code.as_str()) {
                return Err(CatalogError::DuplicateCode {
                    code: definition.code.clone(),
                });
            }
        }
        Ok(Self {
            definitions: definitions.into(),
            defaults: generic::default_table(),
        })
    }

    /// Replace the generic bodies, e.g. to run a catalog without network access.
    pub fn with_defaults(mut self, defaults: IndicatorTable) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether `code` has a generic default body.
    pub fn has_default(&self, code: &str) -> bool {
        self.defaults.contains(code)
    }

    /// Body for `code`: connector override, else generic default, else not implemented.
    pub fn handler_for(&self, code: &str, overrides: &IndicatorTable) -> IndicatorHandler {
        overrides
            .get(code)
            .or_else(|| self.defaults.get(code))
            .cloned()
            .unwrap_or_else(not_implemented)
    }
}

impl Default for IndicatorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Body for codes nobody implements.
pub fn not_implemented() -> IndicatorHandler {
    handler(|_| async { Ok(IndicatorOutcome::not_implemented()) })
}
