//! Registration-authority and landing-page resolution.
//!
//! For a DOI, [`RegistryResolver::resolve_authority`] asks the DOI RA service
//! which agency minted it, then [`RegistryResolver::fetch_canonical_locator`]
//! queries that agency's metadata API for the publisher and landing URL.
//! DataCite and Crossref answer with differently shaped documents; both are
//! adapted to [`Locator`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::HttpFetcher;

/// DOI registration agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    DataCite,
    Crossref,
    Eidr,
    Medra,
    Unknown,
}

impl Authority {
    /// Parse the `RA` field of the DOI RA service.
    pub fn from_ra_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "datacite" => Self::DataCite,
            "crossref" => Self::Crossref,
            "eidr" => Self::Eidr,
            "medra" => Self::Medra,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DataCite => "DataCite",
            Self::Crossref => "Crossref",
            Self::Eidr => "EIDR",
            Self::Medra => "mEDRA",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Publisher and landing page of a DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub publisher: Option<String>,
    pub landing_url: String,
}

/// Result of a locator lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorOutcome {
    Found(Locator),
    NotFound { reason: String },
}

/// Base URLs of the registries queried during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEndpoints {
    pub doi_ra_url: String,
    pub datacite_api: String,
    pub crossref_api: String,
    pub handle_api: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            doi_ra_url: "https://doi.org/ra".to_string(),
            datacite_api: "https://api.datacite.org".to_string(),
            crossref_api: "https://api.crossref.org".to_string(),
            handle_api: "https://hdl.handle.net/api/handles".to_string(),
        }
    }
}

/// Resolves DOIs and handles to landing pages.
pub struct RegistryResolver {
    fetcher: Arc<dyn HttpFetcher>,
    endpoints: RegistryEndpoints,
}

impl RegistryResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, endpoints: RegistryEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Ask the DOI RA service which agency registered `doi`.
    ///
    /// Never fails: network and decoding problems yield [`Authority::Unknown`].
    pub async fn resolve_authority(&self, doi: &str) -> Authority {
        let url = format!("{}/{}", trim_slash(&self.endpoints.doi_ra_url), doi);
        match self.fetcher.get_json(&url).await {
            Ok(body) => {
                let authority = parse_ra_response(&body);
                debug!(doi = %doi, authority = %authority, "registration authority resolved");
                authority
            }
            Err(e) => {
                warn!(doi = %doi, error = %e, "registration authority lookup failed");
                Authority::Unknown
            }
        }
    }

    /// Fetch publisher and landing URL from the authority's metadata API.
    pub async fn fetch_canonical_locator(&self, authority: Authority, doi: &str) -> LocatorOutcome {
        let (url, parse): (String, fn(&Value) -> Option<Locator>) = match authority {
            Authority::DataCite => (
                format!("{}/dois/{}", trim_slash(&self.endpoints.datacite_api), doi),
                parse_datacite_locator,
            ),
            Authority::Crossref => (
                format!("{}/works/{}", trim_slash(&self.endpoints.crossref_api), doi),
                parse_crossref_locator,
            ),
            Authority::Eidr | Authority::Medra | Authority::Unknown => {
                return LocatorOutcome::NotFound {
                    reason: format!("metadata lookup for {authority} DOIs is not supported"),
                };
            }
        };

        match self.fetcher.get_json(&url).await {
            Ok(body) => match parse(&body) {
                Some(locator) => LocatorOutcome::Found(locator),
                None => LocatorOutcome::NotFound {
                    reason: format!("{authority} response has no landing URL"),
                },
            },
            Err(e) => {
                warn!(doi = %doi, authority = %authority, error = %e, "locator lookup failed");
                LocatorOutcome::NotFound {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Resolve a handle to its first `URL` value through the Handle.net REST API.
    pub async fn resolve_handle(&self, handle: &str) -> Option<String> {
        let url = format!("{}/{}", trim_slash(&self.endpoints.handle_api), handle);
        match self.fetcher.get_json(&url).await {
            Ok(body) => parse_handle_response(&body),
            Err(e) => {
                warn!(handle = %handle, error = %e, "handle lookup failed");
                None
            }
        }
    }
}

fn trim_slash(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// `[{"DOI": "...", "RA": "DataCite"}]`
pub fn parse_ra_response(body: &Value) -> Authority {
    body.as_array()
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("RA"))
        .and_then(Value::as_str)
        .map(Authority::from_ra_name)
        .unwrap_or(Authority::Unknown)
}

/// `data.attributes.{publisher,url}`; publisher may be a string or `{name}`.
pub fn parse_datacite_locator(body: &Value) -> Option<Locator> {
    let attributes = body.get("data")?.get("attributes")?;
    let landing_url = non_empty(attributes.get("url")?.as_str()?)?;
    let publisher = attributes.get("publisher").and_then(|p| match p {
        Value::String(s) => non_empty(s),
        Value::Object(_) => p.get("name").and_then(Value::as_str).and_then(non_empty),
        _ => None,
    });
    Some(Locator {
        publisher,
        landing_url,
    })
}

/// `message.publisher` and `message.resource.primary.URL`, falling back to `message.URL`.
pub fn parse_crossref_locator(body: &Value) -> Option<Locator> {
    let message = body.get("message")?;
    let landing_url = message
        .get("resource")
        .and_then(|r| r.get("primary"))
        .and_then(|p| p.get("URL"))
        .and_then(Value::as_str)
        .or_else(|| message.get("URL").and_then(Value::as_str))
        .and_then(non_empty)?;
    let publisher = message
        .get("publisher")
        .and_then(Value::as_str)
        .and_then(non_empty);
    Some(Locator {
        publisher,
        landing_url,
    })
}

/// First `URL`-typed value of a Handle.net response.
pub fn parse_handle_response(body: &Value) -> Option<String> {
    body.get("values")?
        .as_array()?
        .iter()
        .filter(|v| v.get("type").and_then(Value::as_str) == Some("URL"))
        .find_map(|v| v.get("data")?.get("value")?.as_str().and_then(non_empty))
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryFetcher;
    use serde_json::json;

    fn resolver(fetcher: MemoryFetcher) -> RegistryResolver {
        RegistryResolver::new(Arc::new(fetcher), RegistryEndpoints::default())
    }

    #[test]
    fn test_parse_ra_response() {
        let body = json!([{"DOI": "10.5281/zenodo.1", "RA": "DataCite"}]);
        assert_eq!(parse_ra_response(&body), Authority::DataCite);

        let body = json!([{"DOI": "10.1016/x", "RA": "Crossref"}]);
        assert_eq!(parse_ra_response(&body), Authority::Crossref);

        let body = json!([{"DOI": "10.9999/x", "status": "DOI does not exist"}]);
        assert_eq!(parse_ra_response(&body), Authority::Unknown);
    }

    #[test]
    fn test_authority_names() {
        assert_eq!(Authority::from_ra_name("mEDRA"), Authority::Medra);
        assert_eq!(Authority::from_ra_name("EIDR"), Authority::Eidr);
        assert_eq!(Authority::from_ra_name("Airiti"), Authority::Unknown);
    }

    #[test]
    fn test_parse_datacite_publisher_variants() {
        let flat = json!({"data": {"attributes": {
            "publisher": "Zenodo",
            "url": "https://zenodo.org/record/1"
        }}});
        let locator = parse_datacite_locator(&flat).unwrap();
        assert_eq!(locator.publisher.as_deref(), Some("Zenodo"));
        assert_eq!(locator.landing_url, "https://zenodo.org/record/1");

        let nested = json!({"data": {"attributes": {
            "publisher": {"name": "Zenodo"},
            "url": "https://zenodo.org/record/1"
        }}});
        assert_eq!(
            parse_datacite_locator(&nested).unwrap().publisher.as_deref(),
            Some("Zenodo")
        );
    }

    #[test]
    fn test_parse_crossref_prefers_primary_resource() {
        let body = json!({"message": {
            "publisher": "Elsevier BV",
            "URL": "http://dx.doi.org/10.1016/j.x",
            "resource": {"primary": {"URL": "https://linkinghub.elsevier.com/retrieve/x"}}
        }});
        let locator = parse_crossref_locator(&body).unwrap();
        assert_eq!(locator.publisher.as_deref(), Some("Elsevier BV"));
        assert_eq!(
            locator.landing_url,
            "https://linkinghub.elsevier.com/retrieve/x"
        );

        let fallback = json!({"message": {"URL": "http://dx.doi.org/10.1016/j.x"}});
        assert_eq!(
            parse_crossref_locator(&fallback).unwrap().landing_url,
            "http://dx.doi.org/10.1016/j.x"
        );
    }

    #[test]
    fn test_parse_handle_response_picks_url_value() {
        let body = json!({"responseCode": 1, "values": [
            {"index": 100, "type": "HS_ADMIN", "data": {"format": "admin", "value": {}}},
            {"index": 1, "type": "URL", "data": {"format": "string", "value": "https://digital.csic.es/handle/10261/1"}}
        ]});
        assert_eq!(
            parse_handle_response(&body).as_deref(),
            Some("https://digital.csic.es/handle/10261/1")
        );
    }

    #[tokio::test]
    async fn test_resolve_authority_network_failure_is_unknown() {
        let r = resolver(MemoryFetcher::new());
        assert_eq!(r.resolve_authority("10.1234/abc").await, Authority::Unknown);
    }

    #[tokio::test]
    async fn test_fetch_locator_for_datacite() {
        let fetcher = MemoryFetcher::new().with_json(
            "https://api.datacite.org/dois/10.5281/zenodo.1",
            json!({"data": {"attributes": {"publisher": "Zenodo", "url": "https://zenodo.org/record/1"}}}),
        );
        let outcome = resolver(fetcher)
            .fetch_canonical_locator(Authority::DataCite, "10.5281/zenodo.1")
            .await;
        match outcome {
            LocatorOutcome::Found(locator) => {
                assert_eq!(locator.landing_url, "https://zenodo.org/record/1")
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_authorities_are_explicitly_not_found() {
        let r = resolver(MemoryFetcher::new());
        for authority in [Authority::Eidr, Authority::Medra, Authority::Unknown] {
            match r.fetch_canonical_locator(authority, "10.1/x").await {
                LocatorOutcome::NotFound { reason } => {
                    assert!(reason.contains("not supported"), "{reason}")
                }
                other => panic!("expected NotFound for {authority}, got {other:?}"),
            }
        }
    }
}
