//! FAIR Evaluation Core Library
//!
//! Classifies item identifiers, resolves them through DOI and Handle
//! registries, routes them to a repository connector and scores the
//! connector's metadata against the FAIR indicator catalog.

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod connector;
pub mod domain;
pub mod executor;
pub mod fakes;
pub mod http;
pub mod metrics;
pub mod obs;
pub mod resolver;
pub mod router;
pub mod service;
pub mod telemetry;

pub use domain::{
    classify, round2, CanonicalMetadataRecord, CatalogError, CatalogLabels, ColorBand,
    ConnectorError, EvaluationError, EvaluationReport, FetchError, IdScheme, IndicatorDefinition,
    IndicatorOutcome, IndicatorResult, ItemIdentifier, LabelLookup, MetadataStatement, Principle,
    PrincipleScore, ReportView, ResolutionError, Result, RoutingError, Weight, MAX_POINTS,
};

pub use aggregator::compute;
pub use catalog::IndicatorCatalog;
pub use config::{ConfigError, ConfigIssue, FairConfig};
pub use connector::{
    handler, BindContext, BoundConnector, Connector, ConnectorRegistry, IndicatorHandler,
    IndicatorTable,
};
pub use executor::{execute_indicators, ExecutorConfig};
pub use http::{HttpClientConfig, HttpFetcher, ReqwestFetcher, RetryPolicy};
pub use resolver::{Authority, Locator, LocatorOutcome, RegistryEndpoints, RegistryResolver};
pub use router::{domain_of, PluginRoute, RouteTable, Router, TableRouter};
pub use service::{Evaluation, EvaluationRequest, EvaluationService, ServiceBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
