//! End-to-end evaluations against in-memory registries and repositories.

use std::sync::Arc;

use serde_json::{json, Value};

use fair_core::catalog::standard_definitions;
use fair_core::domain::{CanonicalMetadataRecord, ConnectorError, MetadataStatement};
use fair_core::fakes::{MemoryFetcher, StaticConnector};
use fair_core::{
    ConnectorRegistry, EvaluationError, EvaluationRequest, EvaluationService, FairConfig,
    PluginRoute, Principle, RouteTable, ServiceBuilder,
};

const DOI: &str = "10.5281/zenodo.1";

fn datacite_attributes() -> Value {
    json!({
        "doi": DOI,
        "url": "https://zenodo.org/record/1",
        "identifiers": [{"identifier": "https://zenodo.org/record/1", "identifierType": "URL"}],
        "titles": [{"title": "Ocean temperatures"}],
        "creators": [{"name": "Doe, Jane"}],
        "publisher": {"name": "Zenodo"},
        "publicationYear": 2021,
        "subjects": [{"subject": "oceanography"}],
        "descriptions": [{"description": "Daily series", "descriptionType": "Abstract"}],
        "rightsList": [{"rights": "CC BY 4.0", "rightsUri": "https://creativecommons.org/licenses/by/4.0"}],
        "relatedIdentifiers": [{"relatedIdentifier": "10.5281/zenodo.0", "relationType": "IsVersionOf"}],
        "types": {"resourceTypeGeneral": "Dataset"},
        "schemaVersion": "http://datacite.org/schema/kernel-4"
    })
}

fn zenodo_fetcher() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_json(
            format!("https://doi.org/ra/{DOI}"),
            json!([{"DOI": DOI, "RA": "DataCite"}]),
        )
        .with_json(
            format!("https://api.datacite.org/dois/{DOI}"),
            json!({"data": {"attributes": datacite_attributes()}}),
        )
        .with_text(format!("https://doi.org/{DOI}"), "<html>landing page</html>")
}

fn default_service(fetcher: MemoryFetcher) -> EvaluationService {
    ServiceBuilder::from_config(Arc::new(fetcher), &FairConfig::default())
        .unwrap()
        .build()
        .unwrap()
}

fn static_service(connector: Arc<StaticConnector>) -> EvaluationService {
    let mut registry = ConnectorRegistry::new();
    registry.register(connector).unwrap();
    EvaluationService::builder(Arc::new(MemoryFetcher::new()))
        .registry(registry)
        .build()
        .unwrap()
}

#[tokio::test]
async fn datacite_item_is_scored_against_full_catalog() {
    let service = default_service(zenodo_fetcher());

    let evaluation = service
        .evaluate(&EvaluationRequest::new(DOI))
        .await
        .unwrap();

    assert_eq!(evaluation.plugin, "datacite");
    assert_eq!(evaluation.endpoint.as_deref(), Some("https://zenodo.org/oai2d"));
    assert_eq!(evaluation.item.normalized(), DOI);

    let report = &evaluation.report;
    assert_eq!(report.results().count(), standard_definitions().len());
    assert_eq!(report.result("rda_f1_01m").unwrap().points(), 100);
    assert_eq!(report.result("rda_f2_01m").unwrap().points(), 100);
    assert_eq!(report.result("rda_f4_01m").unwrap().points(), 100);
    assert_eq!(report.result("rda_a1_03m").unwrap().points(), 100);
    assert_eq!(report.result("rda_r1_1_01m").unwrap().points(), 100);

    // DataCite's own formal-representation check replaces the generic one
    let i1 = report.result("rda_i1_01m").unwrap();
    assert_eq!(i1.points(), 100);
    assert!(i1.message().contains("DataCite schema"), "{}", i1.message());

    let unimplemented = report
        .results()
        .filter(|r| r.message() == "not implemented")
        .count();
    assert!(unimplemented > 0);
    assert!(report
        .results()
        .filter(|r| r.message() == "not implemented")
        .all(|r| r.points() == 50));

    assert!(!report.overall_incomplete());
    assert!(report.overall() > 50.0);
}

#[tokio::test]
async fn empty_record_still_produces_a_report() {
    let connector = Arc::new(StaticConnector::new("zenodo"));
    let service = static_service(connector.clone());

    let evaluation = service
        .evaluate(&EvaluationRequest::new(DOI).with_repo("zenodo"))
        .await
        .unwrap();
    let report = &evaluation.report;

    for code in [
        "rda_f2_01m",
        "rda_f3_01m",
        "rda_a1_01m",
        "rda_i1_01m",
        "rda_i3_01m",
        "rda_r1_01m",
        "rda_r1_1_01m",
        "rda_r1_2_01m",
    ] {
        let result = report.result(code).unwrap();
        assert_eq!(result.points(), 0, "{code}");
        assert!(result.message().starts_with("missing terms:"), "{code}: {}", result.message());
    }
    // the identifier itself is still a DOI
    assert_eq!(report.result("rda_f1_01m").unwrap().points(), 100);
    assert!(report.principle_scores().iter().all(|s| !s.incomplete()));
    assert!(report.overall() > 0.0);
    assert_eq!(connector.initializations(), 1);
}

#[tokio::test]
async fn connector_is_initialized_once_per_evaluation() {
    let record = CanonicalMetadataRecord::new(vec![
        MetadataStatement::new("dc", "title", "Ocean temperatures"),
        MetadataStatement::new("dc", "rights", "CC BY 4.0"),
    ]);
    let connector = Arc::new(StaticConnector::new("zenodo").with_record(record));
    let service = static_service(connector.clone());
    let request = EvaluationRequest::new(DOI).with_repo("zenodo");

    service.evaluate(&request).await.unwrap();
    assert_eq!(connector.initializations(), 1);

    let (a, b) = futures::join!(service.evaluate(&request), service.evaluate(&request));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(connector.initializations(), 3);
    assert_ne!(a.evaluation_id, b.evaluation_id);
    assert_eq!(a.report, b.report);
}

#[tokio::test]
async fn connector_failure_aborts_the_evaluation() {
    let connector = Arc::new(StaticConnector::new("zenodo").failing("HTTP 503"));
    let service = static_service(connector);

    let err = service
        .evaluate(&EvaluationRequest::new(DOI).with_repo("zenodo"))
        .await
        .unwrap_err();
    match err {
        EvaluationError::ConnectorInit(ConnectorError::MetadataUnavailable {
            connector,
            detail,
            ..
        }) => {
            assert_eq!(connector, "zenodo");
            assert_eq!(detail, "HTTP 503");
        }
        other => panic!("expected ConnectorInit, got {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_doi_fails_connector_initialization() {
    let fetcher = MemoryFetcher::new()
        .with_json(
            format!("https://doi.org/ra/{DOI}"),
            json!([{"DOI": DOI, "RA": "DataCite"}]),
        );
    let service = default_service(fetcher);

    let err = service
        .evaluate(&EvaluationRequest::new(DOI).with_repo("datacite"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EvaluationError::ConnectorInit(ConnectorError::MetadataUnavailable { .. })
    ));
}

#[tokio::test]
async fn request_endpoint_overrides_route_endpoint() {
    let connector = Arc::new(StaticConnector::new("zenodo"));
    let mut registry = ConnectorRegistry::new();
    registry.register(connector).unwrap();
    let service = EvaluationService::builder(Arc::new(MemoryFetcher::new()))
        .registry(registry)
        .routes(RouteTable::new(vec![
            PluginRoute::new("zenodo.org", "zenodo").with_oai_endpoint("https://zenodo.org/oai2d")
        ]))
        .build()
        .unwrap();

    let evaluation = service
        .evaluate(
            &EvaluationRequest::new(DOI)
                .with_repo("zenodo")
                .with_oai_base("https://sandbox.zenodo.org/oai2d"),
        )
        .await
        .unwrap();
    assert_eq!(
        evaluation.endpoint.as_deref(),
        Some("https://sandbox.zenodo.org/oai2d")
    );
    let f4 = evaluation.report.result("rda_f4_01m").unwrap();
    assert_eq!(f4.points(), 100);
    assert!(f4.message().contains("sandbox.zenodo.org"));
}

#[tokio::test]
async fn rendered_view_matches_report() {
    let service = default_service(zenodo_fetcher());
    let request = EvaluationRequest::new(DOI).with_lang("en");
    let evaluation = service.evaluate(&request).await.unwrap();

    let view = service.render(&evaluation, request.lang.as_deref());
    assert_eq!(view.item_id, format!("doi:{DOI}"));
    let indicators: usize = view.principles.values().map(|p| p.len()).sum();
    assert_eq!(indicators, standard_definitions().len());
    assert_eq!(view.overall, evaluation.report.overall_reported());
    for principle in Principle::ALL {
        let summary = &view.summary[principle.as_str()];
        let score = evaluation.report.principle(principle).unwrap();
        assert_eq!(summary.score, score.reported());
        assert_eq!(summary.incomplete, score.incomplete());
    }
}

#[test]
fn default_config_builds_the_reference_service() {
    let service = ServiceBuilder::from_config(Arc::new(MemoryFetcher::new()), &FairConfig::default())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(service.catalog().len(), standard_definitions().len());
}
