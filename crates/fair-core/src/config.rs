//! Service configuration.
//!
//! Loaded once at startup from TOML; every section has defaults, so an
//! empty file is a valid configuration. [`FairConfig::validate`] collects
//! every problem; [`FairConfig::load`] refuses to start when any exists.
//!
//! ```toml
//! [service]
//! indicator_timeout_secs = 15
//! max_concurrent_indicators = 8
//!
//! [[routes]]
//! domain = "zenodo.org"
//! plugin = "datacite"
//! oai_base = "https://zenodo.org/oai2d"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::catalog::IndicatorCatalog;
use crate::connector::{DataCiteSettings, OaiPmhSettings};
use crate::domain::{CatalogError, IndicatorDefinition, Principle, Weight};
use crate::executor::ExecutorConfig;
use crate::http::{HttpClientConfig, RetryPolicy};
use crate::resolver::RegistryEndpoints;
use crate::router::{default_routes, PluginRoute, RouteTable, DEFAULT_OAI_REGISTRY};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "FAIR_CONFIG";

/// One validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("invalid configuration: {}", join_issues(.issues))]
    Invalid { issues: Vec<ConfigIssue> },
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub indicator_timeout_secs: u64,
    pub max_concurrent_indicators: usize,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            indicator_timeout_secs: 15,
            max_concurrent_indicators: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 5,
            backoff_base_ms: 500,
            user_agent: concat!("fair-eval/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub doi_ra_url: String,
    pub datacite_api: String,
    pub crossref_api: String,
    pub handle_api: String,
    pub oai_registry_url: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let endpoints = RegistryEndpoints::default();
        Self {
            doi_ra_url: endpoints.doi_ra_url,
            datacite_api: endpoints.datacite_api,
            crossref_api: endpoints.crossref_api,
            handle_api: endpoints.handle_api,
            oai_registry_url: DEFAULT_OAI_REGISTRY.to_string(),
        }
    }
}

/// `[[routes]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub domain: String,
    pub plugin: String,
    #[serde(default)]
    pub oai_base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorsSection {
    pub oai_pmh: OaiPmhSettings,
    pub datacite: DataCiteSettings,
}

/// `[[indicators]]` entry. Weight stays a raw number so that validation can
/// report it alongside other problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    pub code: String,
    pub principle: Principle,
    pub weight: u8,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairConfig {
    pub service: ServiceSection,
    pub http: HttpSection,
    pub registry: RegistrySection,
    pub routes: Vec<RouteEntry>,
    pub connectors: ConnectorsSection,
    pub indicators: Vec<IndicatorEntry>,
}

impl FairConfig {
    /// Parse TOML without validating.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read, parse and validate `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Load `path` if given, else the file named by `FAIR_CONFIG`, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::load(Path::new(&path)),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { issues })
        }
    }

    /// Every problem in the configuration.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.service.indicator_timeout_secs == 0 {
            issues.push(ConfigIssue::new(
                "service.indicator_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.service.max_concurrent_indicators == 0 {
            issues.push(ConfigIssue::new(
                "service.max_concurrent_indicators",
                "must be greater than 0",
            ));
        }
        if self.http.timeout_secs == 0 {
            issues.push(ConfigIssue::new("http.timeout_secs", "must be greater than 0"));
        }
        if !(1..=10).contains(&self.http.max_attempts) {
            issues.push(ConfigIssue::new(
                "http.max_attempts",
                format!("must be between 1 and 10, got {}", self.http.max_attempts),
            ));
        }

        let urls = [
            ("registry.doi_ra_url", &self.registry.doi_ra_url),
            ("registry.datacite_api", &self.registry.datacite_api),
            ("registry.crossref_api", &self.registry.crossref_api),
            ("registry.handle_api", &self.registry.handle_api),
            ("registry.oai_registry_url", &self.registry.oai_registry_url),
            ("connectors.datacite.api_base", &self.connectors.datacite.api_base),
        ];
        for (field, url) in urls {
            check_url(&mut issues, field, url);
        }

        for (i, route) in self.routes.iter().enumerate() {
            if route.domain.trim().is_empty() {
                issues.push(ConfigIssue::new(format!("routes[{i}].domain"), "must not be empty"));
            }
            if route.plugin.trim().is_empty() {
                issues.push(ConfigIssue::new(format!("routes[{i}].plugin"), "must not be empty"));
            }
            if let Some(base) = &route.oai_base {
                check_url(&mut issues, &format!("routes[{i}].oai_base"), base);
            }
        }

        let mut codes = HashSet::new();
        for (i, entry) in self.indicators.iter().enumerate() {
            if entry.code.trim().is_empty() {
                issues.push(ConfigIssue::new(format!("indicators[{i}].code"), "must not be empty"));
            }
            if !codes.insert(entry.code.as_str()) {
                issues.push(ConfigIssue::new(
                    format!("indicators[{i}].code"),
                    format!("duplicate code '{}'", entry.code),
                ));
            }
            if let Err(e) = Weight::new(entry.weight) {
                issues.push(ConfigIssue::new(format!("indicators[{i}].weight"), e.to_string()));
            }
        }

        issues
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            indicator_timeout: Duration::from_secs(self.service.indicator_timeout_secs),
            max_concurrent: self.service.max_concurrent_indicators,
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone(),
            retry: RetryPolicy {
                max_attempts: self.http.max_attempts,
                backoff_base: Duration::from_millis(self.http.backoff_base_ms),
            },
        }
    }

    pub fn registry_endpoints(&self) -> RegistryEndpoints {
        RegistryEndpoints {
            doi_ra_url: self.registry.doi_ra_url.clone(),
            datacite_api: self.registry.datacite_api.clone(),
            crossref_api: self.registry.crossref_api.clone(),
            handle_api: self.registry.handle_api.clone(),
        }
    }

    /// Configured routes, or the built-in table when none are given.
    pub fn route_table(&self) -> RouteTable {
        if self.routes.is_empty() {
            return RouteTable::new(default_routes());
        }
        RouteTable::new(
            self.routes
                .iter()
                .map(|entry| PluginRoute {
                    domain_pattern: entry.domain.clone(),
                    plugin: entry.plugin.clone(),
                    oai_endpoint: entry.oai_base.clone(),
                })
                .collect(),
        )
    }

    /// Configured catalog, or the standard one when no indicators are given.
    pub fn catalog(&self) -> Result<IndicatorCatalog, CatalogError> {
        if self.indicators.is_empty() {
            return Ok(IndicatorCatalog::standard());
        }
        let definitions = self
            .indicators
            .iter()
            .map(|entry| {
                Ok(IndicatorDefinition::new(
                    entry.code.clone(),
                    entry.principle,
                    Weight::new(entry.weight)?,
                    entry.name.clone(),
                ))
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        IndicatorCatalog::from_definitions(definitions)
    }
}

fn check_url(issues: &mut Vec<ConfigIssue>, field: &str, url: &str) {
    if let Err(e) = Url::parse(url) {
        issues.push(ConfigIssue::new(field, format!("invalid URL '{url}': {e}")));
    }
}
