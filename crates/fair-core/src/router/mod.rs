//! Domain to connector routing.
//!
//! A [`RouteTable`] maps landing-page domains to plugin names. Lookup is a
//! case-insensitive substring match; when several patterns match, the
//! longest one wins and equal lengths keep table order. [`TableRouter`]
//! falls back to OAI-PMH registry discovery for unknown domains.

pub mod discovery;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connector::OAI_PMH_CONNECTOR;
use crate::domain::{ResolutionError, RoutingError};

pub use discovery::{OaiDiscovery, DEFAULT_OAI_REGISTRY};

/// One route table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRoute {
    pub domain_pattern: String,
    pub plugin: String,
    pub oai_endpoint: Option<String>,
}

impl PluginRoute {
    pub fn new(domain_pattern: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            domain_pattern: domain_pattern.into(),
            plugin: plugin.into(),
            oai_endpoint: None,
        }
    }

    pub fn with_oai_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.oai_endpoint = Some(endpoint.into());
        self
    }

    fn matches(&self, domain: &str) -> bool {
        domain
            .to_ascii_lowercase()
            .contains(&self.domain_pattern.to_ascii_lowercase())
    }
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<PluginRoute>,
}

impl RouteTable {
    pub fn new(routes: Vec<PluginRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[PluginRoute] {
        &self.routes
    }

    /// Best entry for `domain`: longest matching pattern, first on ties.
    pub fn lookup(&self, domain: &str) -> Option<&PluginRoute> {
        self.routes
            .iter()
            .filter(|route| route.matches(domain))
            .fold(None, |best: Option<&PluginRoute>, route| match best {
                Some(b) if b.domain_pattern.len() >= route.domain_pattern.len() => Some(b),
                _ => Some(route),
            })
    }
}

/// Routes used when the configuration names none.
pub fn default_routes() -> Vec<PluginRoute> {
    vec![
        PluginRoute::new("zenodo.org", "datacite").with_oai_endpoint("https://zenodo.org/oai2d"),
        PluginRoute::new("figshare.com", "datacite"),
        PluginRoute::new("datadryad.org", "datacite"),
        PluginRoute::new("pangaea.de", "oai-pmh")
            .with_oai_endpoint("https://ws.pangaea.de/oai/provider"),
    ]
}

/// Host of a landing URL, lowercased, without a leading `www.`.
pub fn domain_of(url: &str) -> Result<String, ResolutionError> {
    let invalid = || ResolutionError::InvalidLandingUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url.trim()).map_err(|_| invalid())?;
    let host = parsed.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    Ok(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Picks the connector for a domain.
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, domain: &str) -> Result<PluginRoute, RoutingError>;
}

/// Table lookup with optional OAI-PMH discovery fallback.
pub struct TableRouter {
    table: RouteTable,
    discovery: Option<OaiDiscovery>,
}

impl TableRouter {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            discovery: None,
        }
    }

    pub fn with_discovery(mut self, discovery: OaiDiscovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

#[async_trait]
impl Router for TableRouter {
    async fn route(&self, domain: &str) -> Result<PluginRoute, RoutingError> {
        if let Some(route) = self.table.lookup(domain) {
            debug!(domain = %domain, plugin = %route.plugin, "route table match");
            return Ok(route.clone());
        }

        if let Some(discovery) = &self.discovery {
            if let Some(endpoint) = discovery.discover(domain).await {
                info!(domain = %domain, endpoint = %endpoint, "routed through OAI-PMH discovery");
                return Ok(PluginRoute::new(domain, OAI_PMH_CONNECTOR).with_oai_endpoint(endpoint));
            }
        }

        Err(RoutingError::NoPluginAvailable {
            domain: domain.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            PluginRoute::new("zenodo.org", "zenodo"),
            PluginRoute::new("csic.es", "csic"),
            PluginRoute::new("digital.csic.es", "digital-csic"),
            PluginRoute::new("sandbox.zenodo", "zenodo-sandbox"),
        ])
    }

    #[test]
    fn test_lookup_substring_case_insensitive() {
        let t = table();
        assert_eq!(t.lookup("ZENODO.org").unwrap().plugin, "zenodo");
        assert_eq!(t.lookup("api.zenodo.org").unwrap().plugin, "zenodo");
        assert!(t.lookup("unknown.example").is_none());
    }

    #[test]
    fn test_lookup_longest_pattern_wins() {
        assert_eq!(table().lookup("digital.csic.es").unwrap().plugin, "digital-csic");
    }

    #[test]
    fn test_lookup_equal_length_keeps_table_order() {
        let t = RouteTable::new(vec![
            PluginRoute::new("abc", "first"),
            PluginRoute::new("bcd", "second"),
        ]);
        assert_eq!(t.lookup("abcd.example").unwrap().plugin, "first");
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.Zenodo.org/record/1").unwrap(), "zenodo.org");
        assert_eq!(
            domain_of("http://digital.csic.es/handle/10261/1").unwrap(),
            "digital.csic.es"
        );
        assert!(matches!(
            domain_of("not a url"),
            Err(ResolutionError::InvalidLandingUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_route_without_match_or_discovery_fails() {
        let router = TableRouter::new(table());
        let err = router.route("unknown.example").await.unwrap_err();
        assert_eq!(
            err,
            RoutingError::NoPluginAvailable {
                domain: "unknown.example".to_string()
            }
        );
    }
}
