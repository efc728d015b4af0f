//! Connector contract.
//!
//! A [`Connector`] adapts one repository's API to the canonical metadata
//! model and may override any catalog indicator through an
//! [`IndicatorTable`]. [`BoundConnector`] ties a connector to exactly one
//! item and its fetched record; indicator handlers receive it behind an
//! `Arc` and can only read from it.
//!
//! # Module layout
//!
//! - [`oai_pmh`]: generic OAI-PMH connector, target of endpoint discovery
//! - [`datacite`]: DataCite REST API connector

pub mod datacite;
pub mod oai_pmh;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

use crate::domain::{CanonicalMetadataRecord, ConnectorError, IndicatorOutcome, ItemIdentifier};
use crate::http::HttpFetcher;

pub use datacite::{DataCiteConnector, DataCiteSettings, DATACITE_CONNECTOR};
pub use oai_pmh::{OaiPmhConnector, OaiPmhSettings, OAI_PMH_CONNECTOR};

/// Future returned by an indicator body.
pub type IndicatorFuture = BoxFuture<'static, anyhow::Result<IndicatorOutcome>>;

/// Type-erased indicator body.
pub type IndicatorHandler = Arc<dyn Fn(Arc<BoundConnector>) -> IndicatorFuture + Send + Sync>;

/// Wrap an async function or closure as an [`IndicatorHandler`].
pub fn handler<F, Fut>(f: F) -> IndicatorHandler
where
    F: Fn(Arc<BoundConnector>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<IndicatorOutcome>> + Send + 'static,
{
    Arc::new(move |bound| Box::pin(f(bound)))
}

/// Indicator code to handler map.
#[derive(Clone, Default)]
pub struct IndicatorTable {
    handlers: HashMap<String, IndicatorHandler>,
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `code`, replacing any previous entry.
    pub fn with(mut self, code: impl Into<String>, handler: IndicatorHandler) -> Self {
        self.handlers.insert(code.into(), handler);
        self
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorHandler> {
        self.handlers.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.handlers.contains_key(code)
    }

    /// Registered codes, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for IndicatorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorTable")
            .field("codes", &self.codes())
            .finish()
    }
}

/// Repository adapter.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Plugin name used by the route table.
    fn name(&self) -> &str;

    /// Fetch and normalize the item's metadata.
    ///
    /// Must return [`ConnectorError::MetadataUnavailable`] when the fetch
    /// genuinely failed; an empty record means the repository has no
    /// metadata for the item.
    async fn initialize(
        &self,
        identifier: &ItemIdentifier,
        endpoint: Option<&str>,
    ) -> Result<CanonicalMetadataRecord, ConnectorError>;

    /// Indicator overrides. Codes not present fall back to catalog defaults.
    fn indicators(&self) -> IndicatorTable {
        IndicatorTable::default()
    }
}

/// Request-scoped inputs shared with indicators.
#[derive(Clone)]
pub struct BindContext {
    pub endpoint: Option<String>,
    pub lang: Option<String>,
    pub fetcher: Arc<dyn HttpFetcher>,
}

impl BindContext {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            endpoint: None,
            lang: None,
            fetcher,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_lang(mut self, lang: Option<String>) -> Self {
        self.lang = lang;
        self
    }
}

/// A connector bound to one item and its fetched metadata.
pub struct BoundConnector {
    connector: Arc<dyn Connector>,
    identifier: ItemIdentifier,
    record: CanonicalMetadataRecord,
    context: BindContext,
}

impl BoundConnector {
    /// Initialize `connector` for `identifier` and bind the resulting record.
    #[instrument(skip(connector, context), fields(connector = %connector.name(), item = %identifier))]
    pub async fn bind(
        connector: Arc<dyn Connector>,
        identifier: ItemIdentifier,
        context: BindContext,
    ) -> Result<Arc<Self>, ConnectorError> {
        let record = connector
            .initialize(&identifier, context.endpoint.as_deref())
            .await?;
        debug!(statements = record.len(), "connector initialized");
        Ok(Arc::new(Self {
            connector,
            identifier,
            record,
            context,
        }))
    }

    /// Bind an already fetched record without calling `initialize`.
    pub fn with_record(
        connector: Arc<dyn Connector>,
        identifier: ItemIdentifier,
        record: CanonicalMetadataRecord,
        context: BindContext,
    ) -> Arc<Self> {
        Arc::new(Self {
            connector,
            identifier,
            record,
            context,
        })
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub fn connector_name(&self) -> &str {
        self.connector.name()
    }

    pub fn identifier(&self) -> &ItemIdentifier {
        &self.identifier
    }

    pub fn record(&self) -> &CanonicalMetadataRecord {
        &self.record
    }

    /// OAI-PMH endpoint for the item, when known.
    pub fn endpoint(&self) -> Option<&str> {
        self.context.endpoint.as_deref()
    }

    pub fn lang(&self) -> Option<&str> {
        self.context.lang.as_deref()
    }

    pub fn fetcher(&self) -> &Arc<dyn HttpFetcher> {
        &self.context.fetcher
    }
}

/// Connector registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate connector registration: {name}")]
    Duplicate { name: String },
}

/// Compile-time registry of available connectors by plugin name.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the OAI-PMH and DataCite connectors.
    pub fn with_reference_connectors(
        fetcher: Arc<dyn HttpFetcher>,
        oai_pmh: OaiPmhSettings,
        datacite: DataCiteSettings,
    ) -> Self {
        let mut connectors: HashMap<String, Arc<dyn Connector>> = HashMap::new();
        connectors.insert(
            OAI_PMH_CONNECTOR.to_string(),
            Arc::new(OaiPmhConnector::new(Arc::clone(&fetcher), oai_pmh)),
        );
        connectors.insert(
            DATACITE_CONNECTOR.to_string(),
            Arc::new(DataCiteConnector::new(fetcher, datacite)),
        );
        Self { connectors }
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) -> Result<(), RegistryError> {
        let name = connector.name().to_string();
        if self.connectors.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        self.connectors.insert(name, connector);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connectors.contains_key(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
