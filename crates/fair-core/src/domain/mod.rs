//! Domain model: identifiers, canonical metadata, indicators and reports.

pub mod error;
pub mod identifier;
pub mod indicator;
pub mod metadata;
pub mod report;

pub use error::{
    CatalogError, ConnectorError, EvaluationError, FetchError, ResolutionError, Result,
    RoutingError,
};
pub use identifier::{classify, IdScheme, ItemIdentifier};
pub use indicator::{
    ColorBand, IndicatorDefinition, IndicatorOutcome, IndicatorResult, Principle, Weight,
    MAX_POINTS,
};
pub use metadata::{CanonicalMetadataRecord, MetadataStatement, KNOWN_SCHEMAS};
pub use report::{
    round2, CatalogLabels, EvaluationReport, IndicatorView, LabelLookup, PrincipleScore,
    PrincipleSummary, ReportView, ScoreView,
};
