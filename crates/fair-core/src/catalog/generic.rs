//! Generic indicator bodies.
//!
//! These work on the canonical record alone (plus the identifier and the
//! shared fetcher), so they apply to any connector. Metadata checks never
//! error on sparse records: a missing term scores 0 and is named in the
//! message.

use std::sync::Arc;

use crate::connector::{handler, BoundConnector, IndicatorTable};
use crate::domain::{CanonicalMetadataRecord, IdScheme, IndicatorOutcome, KNOWN_SCHEMAS, MAX_POINTS};

/// Terms used to judge discovery metadata.
pub const DISCOVERY_TERMS: [&str; 7] = [
    "title",
    "creator",
    "date",
    "description",
    "subject",
    "publisher",
    "type",
];

/// Terms used to judge reuse metadata.
pub const REUSE_TERMS: [&str; 12] = [
    "title",
    "creator",
    "contributor",
    "date",
    "description",
    "subject",
    "publisher",
    "type",
    "format",
    "identifier",
    "language",
    "rights",
];

pub const PROVENANCE_TERMS: [&str; 4] = ["creator", "contributor", "date", "publisher"];

/// Table of every generic body, keyed by indicator code.
pub fn default_table() -> IndicatorTable {
    IndicatorTable::new()
        .with("rda_f1_01m", handler(persistent_identifier))
        .with("rda_f1_02m", handler(unique_identifier))
        .with("rda_f2_01m", handler(rich_metadata))
        .with("rda_f3_01m", handler(identifier_in_metadata))
        .with("rda_f4_01m", handler(harvestable))
        .with("rda_a1_01m", handler(access_conditions))
        .with("rda_a1_03m", handler(identifier_resolves))
        .with("rda_a1_04m", handler(standard_protocol))
        .with("rda_i1_01m", handler(formal_vocabulary))
        .with("rda_i3_01m", handler(references))
        .with("rda_r1_01m", handler(plurality_of_attributes))
        .with("rda_r1_1_01m", handler(licence))
        .with("rda_r1_2_01m", handler(provenance))
        .with("rda_r1_3_01m", handler(community_standard))
}

/// Share of `terms` present in `record`, naming the missing ones.
pub fn term_coverage(record: &CanonicalMetadataRecord, terms: &[&str]) -> IndicatorOutcome {
    let missing = record.missing_terms(terms);
    let present = terms.len() - missing.len();
    if missing.is_empty() {
        IndicatorOutcome::pass(format!("all {} terms present", terms.len()))
    } else {
        IndicatorOutcome::proportional(
            present,
            terms.len(),
            format!("missing terms: {}", missing.join(", ")),
        )
    }
}

/// Pass when any of `terms` is present.
fn any_term(record: &CanonicalMetadataRecord, terms: &[&str], found: &str) -> IndicatorOutcome {
    match terms.iter().find(|t| record.has_term(t)) {
        Some(term) => IndicatorOutcome::pass(format!("{found} ({term})")),
        None => IndicatorOutcome::fail(format!("missing terms: {}", terms.join(", "))),
    }
}

/// Whether the identifier's resolver URL answers over HTTP.
///
/// Identifiers without a resolver never resolve. Transient transport
/// failures propagate to the caller.
pub async fn resolves_via_http(bound: &BoundConnector) -> anyhow::Result<bool> {
    match bound.identifier().resolver_url() {
        Some(url) => Ok(bound.fetcher().resolves(&url).await?),
        None => Ok(false),
    }
}

pub async fn persistent_identifier(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let id = bound.identifier();
    Ok(match id.scheme() {
        IdScheme::Doi | IdScheme::Handle => IndicatorOutcome::pass(format!(
            "identifier {} is a persistent {}",
            id.normalized(),
            id.scheme()
        )),
        IdScheme::Uuid => IndicatorOutcome::new(
            MAX_POINTS / 2,
            format!("identifier {} is a UUID without a persistence guarantee", id.normalized()),
        ),
        IdScheme::Internal => IndicatorOutcome::fail(format!(
            "identifier {} is not persistent",
            id.normalized()
        )),
    })
}

pub async fn unique_identifier(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let pid = persistent_identifier(Arc::clone(&bound)).await?;
    if pid.points == MAX_POINTS {
        return Ok(IndicatorOutcome::pass(pid.message));
    }
    let scheme = bound.identifier().scheme();
    Ok(if scheme.is_globally_unique() {
        IndicatorOutcome::pass(format!("{scheme} identifiers are globally unique"))
    } else {
        IndicatorOutcome::fail("identifier is only unique within the repository")
    })
}

pub async fn rich_metadata(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(term_coverage(bound.record(), &DISCOVERY_TERMS))
}

pub async fn identifier_in_metadata(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let record = bound.record();
    let needle = bound.identifier().normalized().to_ascii_lowercase();
    if needle.is_empty() || !record.has_term("identifier") {
        return Ok(IndicatorOutcome::fail("missing terms: identifier"));
    }
    let included = record
        .values("identifier")
        .iter()
        .any(|v| v.to_ascii_lowercase().contains(&needle));
    Ok(if included {
        IndicatorOutcome::pass(format!("identifier {needle} found in metadata"))
    } else {
        IndicatorOutcome::fail(format!("identifier {needle} not found in identifier statements"))
    })
}

pub async fn harvestable(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(match bound.endpoint() {
        Some(endpoint) => IndicatorOutcome::pass(format!("harvestable through OAI-PMH at {endpoint}")),
        None => IndicatorOutcome::fail("no OAI-PMH endpoint known"),
    })
}

pub async fn access_conditions(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(any_term(
        bound.record(),
        &["rights", "accessRights"],
        "access conditions stated",
    ))
}

pub async fn identifier_resolves(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let Some(url) = bound.identifier().resolver_url() else {
        return Ok(IndicatorOutcome::fail(format!(
            "{} identifiers have no resolver",
            bound.identifier().scheme()
        )));
    };
    Ok(if resolves_via_http(&bound).await? {
        IndicatorOutcome::pass(format!("{url} resolves"))
    } else {
        IndicatorOutcome::fail(format!("{url} does not resolve"))
    })
}

pub async fn standard_protocol(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(if resolves_via_http(&bound).await? {
        IndicatorOutcome::pass("metadata reachable over HTTP(S)")
    } else {
        IndicatorOutcome::fail("metadata not reachable through a standard protocol")
    })
}

pub async fn formal_vocabulary(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let record = bound.record();
    if record.is_empty() {
        return Ok(IndicatorOutcome::fail("missing terms: any metadata statement"));
    }
    let known = record
        .statements()
        .iter()
        .filter(|s| KNOWN_SCHEMAS.contains(&s.schema.as_str()))
        .count();
    let unknown: Vec<&str> = record
        .schemas()
        .into_iter()
        .filter(|s| !KNOWN_SCHEMAS.contains(s))
        .collect();
    Ok(if unknown.is_empty() {
        IndicatorOutcome::pass(format!("all statements use {}", record.schemas().join(", ")))
    } else {
        IndicatorOutcome::proportional(
            known,
            record.len(),
            format!("unrecognised schemas: {}", unknown.join(", ")),
        )
    })
}

pub async fn references(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let count = bound.record().values("relation").len();
    Ok(if bound.record().has_term("relation") {
        IndicatorOutcome::pass(format!("{count} related object reference(s)"))
    } else {
        IndicatorOutcome::fail("missing terms: relation")
    })
}

pub async fn plurality_of_attributes(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(term_coverage(bound.record(), &REUSE_TERMS))
}

pub async fn licence(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(any_term(
        bound.record(),
        &["rights", "license"],
        "licence information present",
    ))
}

pub async fn provenance(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    Ok(term_coverage(bound.record(), &PROVENANCE_TERMS))
}

pub async fn community_standard(bound: Arc<BoundConnector>) -> anyhow::Result<IndicatorOutcome> {
    let schemas = bound.record().schemas();
    let standards: Vec<&str> = schemas
        .iter()
        .copied()
        .filter(|s| KNOWN_SCHEMAS.contains(s))
        .collect();
    Ok(if standards.is_empty() {
        IndicatorOutcome::fail(format!(
            "missing terms: statements in any of {}",
            KNOWN_SCHEMAS.join(", ")
        ))
    } else {
        IndicatorOutcome::pass(format!("metadata uses {}", standards.join(", ")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::BindContext;
    use crate::domain::{classify, MetadataStatement};
    use crate::fakes::{MemoryFetcher, StaticConnector};

    fn bind(raw: &str, record: CanonicalMetadataRecord, fetcher: MemoryFetcher) -> Arc<BoundConnector> {
        BoundConnector::with_record(
            Arc::new(StaticConnector::new("test")),
            classify(raw),
            record,
            BindContext::new(Arc::new(fetcher)),
        )
    }

    fn empty(raw: &str) -> Arc<BoundConnector> {
        bind(raw, CanonicalMetadataRecord::default(), MemoryFetcher::new())
    }

    #[tokio::test]
    async fn test_persistent_identifier_by_scheme() {
        let doi = persistent_identifier(empty("10.5281/zenodo.1")).await.unwrap();
        assert_eq!(doi.points, 100);
        let handle = persistent_identifier(empty("hdl:10261/1")).await.unwrap();
        assert_eq!(handle.points, 100);
        let uuid = persistent_identifier(empty("6f1c2a70-3b8e-4c55-9c1f-7e2b1f0a9d11"))
            .await
            .unwrap();
        assert_eq!(uuid.points, 50);
        let internal = persistent_identifier(empty("record-42")).await.unwrap();
        assert_eq!(internal.points, 0);
    }

    #[tokio::test]
    async fn test_unique_identifier_counts_uuid() {
        let uuid = unique_identifier(empty("6f1c2a70-3b8e-4c55-9c1f-7e2b1f0a9d11"))
            .await
            .unwrap();
        assert_eq!(uuid.points, 100);
        let internal = unique_identifier(empty("record-42")).await.unwrap();
        assert_eq!(internal.points, 0);
    }

    #[tokio::test]
    async fn test_blank_identifier_is_never_found_in_metadata() {
        let record: CanonicalMetadataRecord = vec![MetadataStatement::new(
            "dc",
            "identifier",
            "https://zenodo.org/record/1",
        )]
        .into_iter()
        .collect();
        let blank = identifier_in_metadata(bind("   ", record.clone(), MemoryFetcher::new()))
            .await
            .unwrap();
        assert_eq!(blank.points, 0);
        assert_eq!(blank.message, "missing terms: identifier");

        let matching = identifier_in_metadata(bind("zenodo.org/record/1", record, MemoryFetcher::new()))
            .await
            .unwrap();
        assert_eq!(matching.points, 100);
    }

    #[tokio::test]
    async fn test_rich_metadata_names_missing_terms() {
        let record: CanonicalMetadataRecord = vec![
            MetadataStatement::new("dc", "title", "Ocean temperatures"),
            MetadataStatement::new("dc", "creator", "Doe, Jane"),
            MetadataStatement::new("dc", "date", "2021"),
            MetadataStatement::new("dc", "description", "Daily series"),
            MetadataStatement::new("dc", "subject", "oceanography"),
            MetadataStatement::new("dc", "publisher", "Zenodo"),
        ]
        .into_iter()
        .collect();
        let outcome = rich_metadata(bind("10.5281/zenodo.1", record, MemoryFetcher::new()))
            .await
            .unwrap();
        assert_eq!(outcome.points, 85);
        assert_eq!(outcome.message, "missing terms: type");
    }

    #[tokio::test]
    async fn test_empty_record_scores_zero_with_missing_terms() {
        let metadata_bodies: [(&str, fn(Arc<BoundConnector>) -> crate::connector::IndicatorFuture); 8] = [
            ("f2", |b| Box::pin(rich_metadata(b))),
            ("f3", |b| Box::pin(identifier_in_metadata(b))),
            ("a1", |b| Box::pin(access_conditions(b))),
            ("i1", |b| Box::pin(formal_vocabulary(b))),
            ("i3", |b| Box::pin(references(b))),
            ("r1", |b| Box::pin(plurality_of_attributes(b))),
            ("r1_1", |b| Box::pin(licence(b))),
            ("r1_2", |b| Box::pin(provenance(b))),
        ];
        for (label, body) in metadata_bodies {
            let outcome = body(empty("10.5281/zenodo.1")).await.unwrap();
            assert_eq!(outcome.points, 0, "{label}");
            assert!(outcome.message.starts_with("missing terms:"), "{label}: {}", outcome.message);
        }
        let standard = community_standard(empty("10.5281/zenodo.1")).await.unwrap();
        assert_eq!(standard.points, 0);
    }

    #[tokio::test]
    async fn test_identifier_in_metadata_is_case_insensitive() {
        let record: CanonicalMetadataRecord =
            vec![MetadataStatement::new("dc", "identifier", "https://doi.org/10.5281/ZENODO.1")]
                .into_iter()
                .collect();
        let outcome = identifier_in_metadata(bind("10.5281/zenodo.1", record, MemoryFetcher::new()))
            .await
            .unwrap();
        assert_eq!(outcome.points, 100);
    }

    #[tokio::test]
    async fn test_identifier_resolves_uses_resolver_url() {
        let fetcher = MemoryFetcher::new().with_text("https://doi.org/10.5281/zenodo.1", "<html/>");
        let ok = identifier_resolves(bind(
            "10.5281/zenodo.1",
            CanonicalMetadataRecord::default(),
            fetcher,
        ))
        .await
        .unwrap();
        assert_eq!(ok.points, 100);

        let missing = identifier_resolves(empty("10.5281/zenodo.2")).await.unwrap();
        assert_eq!(missing.points, 0);

        let internal = identifier_resolves(empty("record-42")).await.unwrap();
        assert!(internal.message.contains("no resolver"));
    }

    #[tokio::test]
    async fn test_composed_helper_failure_propagates() {
        let fetcher = MemoryFetcher::new()
            .with_transport_error("https://doi.org/10.5281/zenodo.1", "connection refused");
        let bound = bind("10.5281/zenodo.1", CanonicalMetadataRecord::default(), fetcher);
        assert!(standard_protocol(bound).await.is_err());
    }

    #[tokio::test]
    async fn test_formal_vocabulary_partial() {
        let record: CanonicalMetadataRecord = vec![
            MetadataStatement::new("dc", "title", "A"),
            MetadataStatement::new("marc", "245", "A"),
        ]
        .into_iter()
        .collect();
        let outcome = formal_vocabulary(bind("10.1/x", record, MemoryFetcher::new()))
            .await
            .unwrap();
        assert_eq!(outcome.points, 50);
        assert!(outcome.message.contains("marc"));
    }
}
