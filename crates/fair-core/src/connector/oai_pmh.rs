//! Generic OAI-PMH connector.
//!
//! Harvests one record with `GetRecord` and flattens the children of the
//! metadata container (e.g. `oai_dc:dc`) into canonical statements.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connector::{handler, BoundConnector, Connector, IndicatorTable};
use crate::domain::{
    CanonicalMetadataRecord, ConnectorError, IndicatorOutcome, ItemIdentifier, MetadataStatement,
};
use crate::http::HttpFetcher;

/// Plugin name of the generic OAI-PMH connector.
pub const OAI_PMH_CONNECTOR: &str = "oai-pmh";

/// Connector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OaiPmhSettings {
    /// `metadataPrefix` requested from the endpoint.
    pub metadata_prefix: String,
    /// Prepended to the item identifier, e.g. `oai:zenodo.org:`.
    pub identifier_prefix: Option<String>,
}

impl Default for OaiPmhSettings {
    fn default() -> Self {
        Self {
            metadata_prefix: "oai_dc".to_string(),
            identifier_prefix: None,
        }
    }
}

/// Parsed `GetRecord` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetRecordResponse {
    Record(CanonicalMetadataRecord),
    Error { code: String, message: String },
}

pub struct OaiPmhConnector {
    fetcher: Arc<dyn HttpFetcher>,
    settings: OaiPmhSettings,
}

impl OaiPmhConnector {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, settings: OaiPmhSettings) -> Self {
        Self { fetcher, settings }
    }

    fn oai_identifier(&self, identifier: &ItemIdentifier) -> String {
        match &self.settings.identifier_prefix {
            Some(prefix) => format!("{prefix}{}", identifier.normalized()),
            None => identifier.normalized().to_string(),
        }
    }

    fn unavailable(&self, identifier: &ItemIdentifier, detail: impl Into<String>) -> ConnectorError {
        ConnectorError::MetadataUnavailable {
            connector: OAI_PMH_CONNECTOR.to_string(),
            identifier: identifier.to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl Connector for OaiPmhConnector {
    fn name(&self) -> &str {
        OAI_PMH_CONNECTOR
    }

    async fn initialize(
        &self,
        identifier: &ItemIdentifier,
        endpoint: Option<&str>,
    ) -> Result<CanonicalMetadataRecord, ConnectorError> {
        let endpoint = endpoint.ok_or_else(|| ConnectorError::MissingEndpoint {
            connector: OAI_PMH_CONNECTOR.to_string(),
        })?;
        let oai_id = self.oai_identifier(identifier);
        let url = Url::parse_with_params(
            endpoint,
            &[
                ("verb", "GetRecord"),
                ("metadataPrefix", self.settings.metadata_prefix.as_str()),
                ("identifier", oai_id.as_str()),
            ],
        )
        .map_err(|e| self.unavailable(identifier, format!("invalid endpoint {endpoint}: {e}")))?;

        let body = self
            .fetcher
            .get_text(url.as_str())
            .await
            .map_err(|e| self.unavailable(identifier, e.to_string()))?;

        match parse_get_record(&body, &self.settings.metadata_prefix).map_err(|detail| {
            ConnectorError::Parse {
                connector: OAI_PMH_CONNECTOR.to_string(),
                detail,
            }
        })? {
            GetRecordResponse::Record(record) => {
                debug!(oai_id = %oai_id, statements = record.len(), "OAI-PMH record harvested");
                Ok(record)
            }
            GetRecordResponse::Error { code, message } => Err(self.unavailable(
                identifier,
                format!("OAI-PMH error {code}: {message}"),
            )),
        }
    }

    fn indicators(&self) -> IndicatorTable {
        IndicatorTable::new()
            .with("rda_f4_01m", handler(harvestable))
            .with("rda_a1_04m", handler(standard_protocol))
    }
}

/// Whether the bound endpoint answers the `Identify` verb.
pub async fn identify_responds(bound: &BoundConnector) -> anyhow::Result<bool> {
    let endpoint = bound
        .endpoint()
        .context("no OAI-PMH endpoint bound to the item")?;
    let url = Url::parse_with_params(endpoint, &[("verb", "Identify")])
        .with_context(|| format!("invalid OAI-PMH endpoint {endpoint}"))?;
    let body = bound.fetcher().get_text(url.as_str()).await?;
    Ok(body.contains("<Identify"))
}

async fn harvestable(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    if identify_responds(&bound).await? {
        Ok(IndicatorOutcome::pass(
            "metadata is harvestable through a responding OAI-PMH endpoint",
        ))
    } else {
        Ok(IndicatorOutcome::fail(
            "OAI-PMH endpoint did not answer the Identify verb",
        ))
    }
}

async fn standard_protocol(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    if identify_responds(&bound).await? {
        Ok(IndicatorOutcome::pass("metadata is served over OAI-PMH"))
    } else {
        Ok(IndicatorOutcome::fail(
            "OAI-PMH endpoint is not responding to standard requests",
        ))
    }
}

/// Parse a `GetRecord` document into statements or an OAI-PMH error.
///
/// Elements without a namespace prefix are attributed to `default_schema`.
pub fn parse_get_record(xml: &str, default_schema: &str) -> Result<GetRecordResponse, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut metadata_depth: Option<usize> = None;
    let mut field_text = String::new();
    let mut error: Option<(String, String)> = None;
    let mut in_error = false;
    let mut statements = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if local_name(&name) == "error" && metadata_depth.is_none() {
                    error = Some((error_code(&e)?, String::new()));
                    in_error = true;
                }
                if local_name(&name) == "metadata" && metadata_depth.is_none() {
                    metadata_depth = Some(path.len() + 1);
                }
                path.push(name);
                field_text.clear();
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if local_name(&name) == "error" && metadata_depth.is_none() {
                    error = Some((error_code(&e)?, String::new()));
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if in_error {
                    if let Some((_, message)) = error.as_mut() {
                        message.push_str(&text);
                    }
                } else {
                    field_text.push_str(&text);
                }
            }
            Event::CData(c) => {
                field_text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(_) => {
                let is_field = metadata_depth.is_some_and(|depth| path.len() == depth + 2);
                if let Some(name) = path.pop() {
                    if is_field {
                        let value = field_text.trim();
                        if !value.is_empty() {
                            let (schema, element) = split_qname(&name, default_schema);
                            statements.push(MetadataStatement::new(schema, element, value));
                        }
                    }
                    if local_name(&name) == "error" {
                        in_error = false;
                    }
                    if metadata_depth.is_some_and(|depth| path.len() + 1 == depth)
                        && local_name(&name) == "metadata"
                    {
                        metadata_depth = None;
                    }
                }
                field_text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((code, message)) = error {
        return Ok(GetRecordResponse::Error {
            code,
            message: message.trim().to_string(),
        });
    }
    Ok(GetRecordResponse::Record(CanonicalMetadataRecord::new(
        statements,
    )))
}

fn error_code(element: &BytesStart<'_>) -> Result<String, String> {
    let Some(attribute) = element
        .try_get_attribute("code")
        .map_err(|e| e.to_string())?
    else {
        return Ok(String::new());
    };
    attribute
        .unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| e.to_string())
}

fn local_name(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

fn split_qname<'a>(qname: &'a str, default_schema: &'a str) -> (&'a str, &'a str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => (default_schema, qname),
    }
}
