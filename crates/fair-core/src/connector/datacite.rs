//! DataCite REST API connector.
//!
//! Maps `data.attributes` of `GET /dois/<doi>` onto the canonical model
//! under the `datacite` schema, using Dublin Core style element names so
//! that catalog defaults apply unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connector::{handler, BoundConnector, Connector, IndicatorTable};
use crate::domain::{
    CanonicalMetadataRecord, ConnectorError, FetchError, IdScheme, IndicatorOutcome,
    ItemIdentifier, MetadataStatement,
};
use crate::http::HttpFetcher;

/// Plugin name of the DataCite connector.
pub const DATACITE_CONNECTOR: &str = "datacite";

const SCHEMA: &str = "datacite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataCiteSettings {
    pub api_base: String,
}

impl Default for DataCiteSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.datacite.org".to_string(),
        }
    }
}

pub struct DataCiteConnector {
    fetcher: Arc<dyn HttpFetcher>,
    settings: DataCiteSettings,
}

impl DataCiteConnector {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, settings: DataCiteSettings) -> Self {
        Self { fetcher, settings }
    }
}

#[async_trait]
impl Connector for DataCiteConnector {
    fn name(&self) -> &str {
        DATACITE_CONNECTOR
    }

    async fn initialize(
        &self,
        identifier: &ItemIdentifier,
        _endpoint: Option<&str>,
    ) -> Result<CanonicalMetadataRecord, ConnectorError> {
        if identifier.scheme() != IdScheme::Doi {
            return Err(ConnectorError::MetadataUnavailable {
                connector: DATACITE_CONNECTOR.to_string(),
                identifier: identifier.to_string(),
                detail: "DataCite only serves DOIs".to_string(),
            });
        }

        let url = format!(
            "{}/dois/{}",
            self.settings.api_base.trim_end_matches('/'),
            identifier.normalized()
        );
        let body = self.fetcher.get_json(&url).await.map_err(|e| {
            let detail = match &e {
                FetchError::Status { status: 404, .. } => "DOI not registered with DataCite".to_string(),
                _ => e.to_string(),
            };
            ConnectorError::MetadataUnavailable {
                connector: DATACITE_CONNECTOR.to_string(),
                identifier: identifier.to_string(),
                detail,
            }
        })?;

        let attributes = body
            .get("data")
            .and_then(|d| d.get("attributes"))
            .ok_or_else(|| ConnectorError::Parse {
                connector: DATACITE_CONNECTOR.to_string(),
                detail: "response has no data.attributes".to_string(),
            })?;
        Ok(map_attributes(attributes))
    }

    fn indicators(&self) -> IndicatorTable {
        IndicatorTable::new().with("rda_i1_01m", handler(formal_representation))
    }
}

async fn formal_representation(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    match bound.record().values("schemaVersion").first() {
        Some(version) => Ok(IndicatorOutcome::pass(format!(
            "metadata follows the DataCite schema ({version})"
        ))),
        None => Ok(IndicatorOutcome::fail("missing terms: schemaVersion")),
    }
}

/// Flatten DataCite JSON attributes into canonical statements.
pub fn map_attributes(attributes: &Value) -> CanonicalMetadataRecord {
    let mut out = Vec::new();

    if let Some(doi) = str_at(attributes, "doi") {
        out.push(MetadataStatement::new(SCHEMA, "identifier", doi).with_qualifier("doi"));
    }
    for id in array_at(attributes, "identifiers") {
        if let Some(value) = str_at(id, "identifier") {
            let statement = MetadataStatement::new(SCHEMA, "identifier", value);
            out.push(match str_at(id, "identifierType") {
                Some(kind) => statement.with_qualifier(kind.to_ascii_lowercase()),
                None => statement,
            });
        }
    }
    for title in array_at(attributes, "titles") {
        push_str(&mut out, "title", str_at(title, "title"), None);
    }
    for creator in array_at(attributes, "creators") {
        push_str(&mut out, "creator", str_at(creator, "name"), None);
    }
    for contributor in array_at(attributes, "contributors") {
        push_str(
            &mut out,
            "contributor",
            str_at(contributor, "name"),
            str_at(contributor, "contributorType"),
        );
    }
    let publisher = attributes.get("publisher").and_then(|p| match p {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => str_at(p, "name"),
        _ => None,
    });
    push_str(&mut out, "publisher", publisher, None);

    if let Some(year) = attributes.get("publicationYear") {
        let year = match year {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        };
        if let Some(year) = year {
            out.push(MetadataStatement::new(SCHEMA, "date", year).with_qualifier("issued"));
        }
    }
    for date in array_at(attributes, "dates") {
        let qualifier = str_at(date, "dateType").map(str::to_ascii_lowercase);
        push_str(&mut out, "date", str_at(date, "date"), qualifier.as_deref());
    }
    for subject in array_at(attributes, "subjects") {
        push_str(&mut out, "subject", str_at(subject, "subject"), None);
    }
    for description in array_at(attributes, "descriptions") {
        push_str(
            &mut out,
            "description",
            str_at(description, "description"),
            str_at(description, "descriptionType"),
        );
    }
    for rights in array_at(attributes, "rightsList") {
        push_str(&mut out, "rights", str_at(rights, "rights"), None);
        push_str(&mut out, "rights", str_at(rights, "rightsUri"), Some("uri"));
    }
    for related in array_at(attributes, "relatedIdentifiers") {
        push_str(
            &mut out,
            "relation",
            str_at(related, "relatedIdentifier"),
            str_at(related, "relationType"),
        );
    }
    for format in array_at(attributes, "formats") {
        push_str(&mut out, "format", format.as_str(), None);
    }
    if let Some(types) = attributes.get("types") {
        push_str(&mut out, "type", str_at(types, "resourceTypeGeneral"), None);
    }
    push_str(&mut out, "language", str_at(attributes, "language"), None);
    push_str(&mut out, "schemaVersion", str_at(attributes, "schemaVersion"), None);

    CanonicalMetadataRecord::new(out)
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn array_at<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn push_str(
    out: &mut Vec<MetadataStatement>,
    element: &str,
    value: Option<&str>,
    qualifier: Option<&str>,
) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    let statement = MetadataStatement::new(SCHEMA, element, value);
    out.push(match qualifier {
        Some(q) => statement.with_qualifier(q),
        None => statement,
    });
}
