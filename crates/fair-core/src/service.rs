//! Evaluation service: one request in, one report out.
//!
//! Flow per request:
//!
//! 1. classify the identifier;
//! 2. pick a connector, either the one named in the request or by routing
//!    the landing-page domain obtained from the registries;
//! 3. bind the connector (one metadata fetch);
//! 4. run the catalog through the executor;
//! 5. aggregate.
//!
//! Only steps 1-3 can fail the request. Indicator failures are folded into
//! the report by the executor.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator;
use crate::catalog::IndicatorCatalog;
use crate::config::{ConfigError, ConfigIssue, FairConfig};
use crate::connector::{BindContext, BoundConnector, Connector, ConnectorRegistry, OAI_PMH_CONNECTOR};
use crate::domain::{
    classify, CatalogLabels, EvaluationError, EvaluationReport, IdScheme, ItemIdentifier,
    LabelLookup, ReportView, ResolutionError, Result, RoutingError,
};
use crate::executor::{execute_indicators, ExecutorConfig};
use crate::http::HttpFetcher;
use crate::metrics::METRICS;
use crate::obs::{self, EvaluationSpan};
use crate::resolver::{LocatorOutcome, RegistryEndpoints, RegistryResolver};
use crate::router::{domain_of, OaiDiscovery, RouteTable, Router, TableRouter};

/// Repository value meaning "route by resolved domain".
pub const AUTO_REPO: &str = "auto";

/// One evaluation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub id: String,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub oai_base: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

impl EvaluationRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_oai_base(mut self, oai_base: impl Into<String>) -> Self {
        self.oai_base = Some(oai_base.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Repository named by the caller; `None` for empty or `"auto"`.
    pub fn explicit_repo(&self) -> Option<&str> {
        self.repo
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case(AUTO_REPO))
    }
}

/// Completed evaluation. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub item: ItemIdentifier,
    pub plugin: String,
    pub endpoint: Option<String>,
    pub duration_ms: u64,
    pub report: EvaluationReport,
}

struct Selection {
    connector: Arc<dyn Connector>,
    plugin: String,
    endpoint: Option<String>,
}

/// Builds an [`EvaluationService`].
pub struct ServiceBuilder {
    fetcher: Arc<dyn HttpFetcher>,
    registry: Option<ConnectorRegistry>,
    routes: RouteTable,
    discovery_url: Option<String>,
    endpoints: RegistryEndpoints,
    catalog: IndicatorCatalog,
    executor: ExecutorConfig,
    labels: Arc<dyn LabelLookup>,
}

impl ServiceBuilder {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            fetcher,
            registry: None,
            routes: RouteTable::default(),
            discovery_url: None,
            endpoints: RegistryEndpoints::default(),
            catalog: IndicatorCatalog::standard(),
            executor: ExecutorConfig::default(),
            labels: Arc::new(CatalogLabels),
        }
    }

    /// Builder populated from a validated configuration, with the
    /// reference connectors registered.
    pub fn from_config(fetcher: Arc<dyn HttpFetcher>, config: &FairConfig) -> std::result::Result<Self, ConfigError> {
        config.ensure_valid()?;
        let catalog = config.catalog().map_err(|e| ConfigError::Invalid {
            issues: vec![ConfigIssue {
                field: "indicators".to_string(),
                message: e.to_string(),
            }],
        })?;
        let registry = ConnectorRegistry::with_reference_connectors(
            Arc::clone(&fetcher),
            config.connectors.oai_pmh.clone(),
            config.connectors.datacite.clone(),
        );
        Ok(Self::new(fetcher)
            .registry(registry)
            .routes(config.route_table())
            .discovery(config.registry.oai_registry_url.clone())
            .endpoints(config.registry_endpoints())
            .catalog(catalog)
            .executor(config.executor_config()))
    }

    pub fn registry(mut self, registry: ConnectorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Enable OAI-PMH discovery against the registry at `url`.
    pub fn discovery(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = Some(url.into());
        self
    }

    pub fn endpoints(mut self, endpoints: RegistryEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn catalog(mut self, catalog: IndicatorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn labels(mut self, labels: Arc<dyn LabelLookup>) -> Self {
        self.labels = labels;
        self
    }

    /// Fails when a route names a plugin that is not registered, or when
    /// discovery is enabled without an OAI-PMH connector to route to.
    pub fn build(self) -> std::result::Result<EvaluationService, RoutingError> {
        let registry = self.registry.unwrap_or_default();
        let discovery_target = self
            .discovery_url
            .as_ref()
            .map(|_| OAI_PMH_CONNECTOR);
        let required = self
            .routes
            .routes()
            .iter()
            .map(|route| route.plugin.as_str())
            .chain(discovery_target);
        if let Some(name) = required.into_iter().find(|name| !registry.contains(name)) {
            return Err(RoutingError::UnknownPlugin {
                name: name.to_string(),
            });
        }

        let mut router = TableRouter::new(self.routes.clone());
        if let Some(url) = self.discovery_url {
            router = router.with_discovery(OaiDiscovery::new(Arc::clone(&self.fetcher), url));
        }

        Ok(EvaluationService {
            resolver: RegistryResolver::new(Arc::clone(&self.fetcher), self.endpoints),
            fetcher: self.fetcher,
            registry,
            routes: self.routes,
            router: Box::new(router),
            catalog: self.catalog,
            executor: self.executor,
            labels: self.labels,
        })
    }
}

/// Shared, immutable evaluation engine.
pub struct EvaluationService {
    fetcher: Arc<dyn HttpFetcher>,
    registry: ConnectorRegistry,
    routes: RouteTable,
    router: Box<dyn Router>,
    resolver: RegistryResolver,
    catalog: IndicatorCatalog,
    executor: ExecutorConfig,
    labels: Arc<dyn LabelLookup>,
}

impl EvaluationService {
    pub fn builder(fetcher: Arc<dyn HttpFetcher>) -> ServiceBuilder {
        ServiceBuilder::new(fetcher)
    }

    pub fn catalog(&self) -> &IndicatorCatalog {
        &self.catalog
    }

    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    /// Evaluate one item.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation> {
        let evaluation_id = Uuid::new_v4();
        let item = classify(&request.id);
        let span = EvaluationSpan::new(&evaluation_id.to_string(), &item.to_string());
        span.scope(self.run(evaluation_id, item, request)).await
    }

    /// External response shape for `evaluation`.
    pub fn render(&self, evaluation: &Evaluation, lang: Option<&str>) -> ReportView {
        evaluation.report.to_view(self.labels.as_ref(), lang)
    }

    async fn run(
        &self,
        evaluation_id: Uuid,
        item: ItemIdentifier,
        request: &EvaluationRequest,
    ) -> Result<Evaluation> {
        let id = evaluation_id.to_string();
        let started = Instant::now();
        METRICS.inc_evaluations();
        obs::emit_evaluation_started(&id, &request.id, request.repo.as_deref());

        let selection = match self.select(&item, request).await {
            Ok(selection) => selection,
            Err(e) => return Err(self.fail(&id, e)),
        };
        obs::emit_evaluation_routed(&id, &selection.plugin, selection.endpoint.as_deref());

        let context = BindContext::new(Arc::clone(&self.fetcher))
            .with_endpoint(selection.endpoint.clone())
            .with_lang(request.lang.clone());
        let bound = match BoundConnector::bind(selection.connector, item.clone(), context).await {
            Ok(bound) => bound,
            Err(e) => return Err(self.fail(&id, e.into())),
        };

        let results = execute_indicators(bound, &self.catalog, &self.executor).await;
        let indicators = results.len();
        let report = aggregator::compute(&item.to_string(), results);
        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_evaluation_finished(&id, indicators, report.overall_reported(), duration_ms);

        Ok(Evaluation {
            evaluation_id,
            generated_at: Utc::now(),
            item,
            plugin: selection.plugin,
            endpoint: selection.endpoint,
            duration_ms,
            report,
        })
    }

    fn fail(&self, evaluation_id: &str, error: EvaluationError) -> EvaluationError {
        METRICS.inc_evaluations_failed();
        obs::emit_evaluation_failed(evaluation_id, &error);
        error
    }

    async fn select(&self, item: &ItemIdentifier, request: &EvaluationRequest) -> Result<Selection> {
        if let Some(repo) = request.explicit_repo() {
            let connector = self.connector(repo)?;
            let endpoint = request.oai_base.clone().or_else(|| {
                self.routes
                    .routes()
                    .iter()
                    .find(|route| route.plugin == repo)
                    .and_then(|route| route.oai_endpoint.clone())
            });
            return Ok(Selection {
                connector,
                plugin: repo.to_string(),
                endpoint,
            });
        }

        let domain = self.landing_domain(item).await?;
        let route = self.router.route(&domain).await?;
        Ok(Selection {
            connector: self.connector(&route.plugin)?,
            endpoint: request.oai_base.clone().or(route.oai_endpoint),
            plugin: route.plugin,
        })
    }

    fn connector(&self, name: &str) -> std::result::Result<Arc<dyn Connector>, RoutingError> {
        self.registry
            .get(name)
            .ok_or_else(|| RoutingError::UnknownPlugin {
                name: name.to_string(),
            })
    }

    async fn landing_domain(&self, item: &ItemIdentifier) -> std::result::Result<String, ResolutionError> {
        match item.scheme() {
            IdScheme::Doi => {
                let doi = item.normalized();
                let authority = self.resolver.resolve_authority(doi).await;
                match self.resolver.fetch_canonical_locator(authority, doi).await {
                    LocatorOutcome::Found(locator) => domain_of(&locator.landing_url),
                    LocatorOutcome::NotFound { reason } => Err(ResolutionError::LocatorNotFound {
                        doi: doi.to_string(),
                        reason,
                    }),
                }
            }
            IdScheme::Handle => {
                let handle = item.normalized();
                let url = self.resolver.resolve_handle(handle).await.ok_or_else(|| {
                    ResolutionError::HandleUnresolved {
                        handle: handle.to_string(),
                    }
                })?;
                domain_of(&url)
            }
            IdScheme::Uuid | IdScheme::Internal => Err(ResolutionError::Unroutable {
                raw: item.raw().to_string(),
                scheme: item.scheme(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryFetcher, StaticConnector};
    use crate::router::PluginRoute;

    #[test]
    fn test_explicit_repo() {
        assert_eq!(EvaluationRequest::new("x").explicit_repo(), None);
        assert_eq!(EvaluationRequest::new("x").with_repo("").explicit_repo(), None);
        assert_eq!(EvaluationRequest::new("x").with_repo("AUTO").explicit_repo(), None);
        assert_eq!(
            EvaluationRequest::new("x").with_repo("zenodo").explicit_repo(),
            Some("zenodo")
        );
    }

    #[test]
    fn test_build_rejects_unknown_route_plugin() {
        let mut registry = ConnectorRegistry::new();
        registry
            .register(Arc::new(StaticConnector::new("zenodo")))
            .unwrap();
        let err = EvaluationService::builder(Arc::new(MemoryFetcher::new()))
            .registry(registry)
            .routes(RouteTable::new(vec![
                PluginRoute::new("zenodo.org", "zenodo"),
                PluginRoute::new("figshare.com", "figshare"),
            ]))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            RoutingError::UnknownPlugin {
                name: "figshare".to_string()
            }
        );
    }

    #[test]
    fn test_build_rejects_discovery_without_oai_pmh_connector() {
        let mut registry = ConnectorRegistry::new();
        registry
            .register(Arc::new(StaticConnector::new("zenodo")))
            .unwrap();
        let err = EvaluationService::builder(Arc::new(MemoryFetcher::new()))
            .registry(registry.clone())
            .discovery("https://registry.test/ListFriends")
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            RoutingError::UnknownPlugin {
                name: OAI_PMH_CONNECTOR.to_string()
            }
        );

        registry
            .register(Arc::new(StaticConnector::new(OAI_PMH_CONNECTOR)))
            .unwrap();
        assert!(EvaluationService::builder(Arc::new(MemoryFetcher::new()))
            .registry(registry)
            .discovery("https://registry.test/ListFriends")
            .build()
            .is_ok());
    }

    #[tokio::test]
    async fn test_internal_id_without_repo_is_unroutable() {
        let service = EvaluationService::builder(Arc::new(MemoryFetcher::new()))
            .build()
            .unwrap();
        let err = service
            .evaluate(&EvaluationRequest::new("record-42"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Resolution(ResolutionError::Unroutable {
                scheme: IdScheme::Internal,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_explicit_repo() {
        let service = EvaluationService::builder(Arc::new(MemoryFetcher::new()))
            .build()
            .unwrap();
        let err = service
            .evaluate(&EvaluationRequest::new("10.1/x").with_repo("nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Routing(RoutingError::UnknownPlugin { .. })
        ));
    }
}
