//! Integration tests for the ingestion client and conflict resolver.
//!
//! These tests verify the full submission protocol against a mock API.

use exporter_core::ingest::ResourceDescriptor;
use exporter_core::{
    ClientOptions, ConflictResolver, IngestClient, IngestError, Outcome, Resolution, SourceLinks,
    StaticPrompt, Work,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/study/api/v1";

fn sample_work() -> Work {
    let mut work = Work::new(
        "A Sample Title",
        SourceLinks::One("https://example.com/works/1".to_string()),
    );
    work.serial_number = Some("ABC-123".to_string());
    work.release_date = Some("2021-03-05".to_string());
    work.producer = Some("Example Studio".to_string());
    work
}

async fn client_for(server: &MockServer) -> IngestClient {
    IngestClient::new(
        &format!("{}{API_PATH}", server.uri()),
        &ClientOptions::default(),
    )
    .expect("client should build against mock API")
}

#[tokio::test]
async fn test_submit_created_on_201() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .and(query_param("merge", "1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "w-17"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).await.submit(&sample_work()).await;
    assert_eq!(
        outcome.unwrap(),
        Outcome::Created {
            id: "w-17".to_string()
        }
    );
}

#[tokio::test]
async fn test_submit_updated_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 17})))
        .mount(&server)
        .await;

    let outcome = client_for(&server).await.submit(&sample_work()).await;
    assert_eq!(outcome.unwrap(), Outcome::Updated { id: "17".to_string() });
}

#[tokio::test]
async fn test_submit_ignored_on_204() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = client_for(&server).await.submit(&sample_work()).await;
    assert_eq!(outcome.unwrap(), Outcome::Ignored);
}

#[tokio::test]
async fn test_submit_without_serial_uses_best_match_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/none")))
        .and(query_param("merge", "1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "w-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut work = sample_work();
    work.serial_number = None;
    let outcome = client_for(&server).await.submit(&work).await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_submit_conflict_reports_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "data": [{"field": "title"}, {"field": "producer"}]
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server).await.submit(&sample_work()).await;
    assert_eq!(
        outcome.unwrap(),
        Outcome::Conflict {
            fields: vec!["title".to_string(), "producer".to_string()]
        }
    );
}

#[tokio::test]
async fn test_submit_server_error_surfaces_body_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let result = client_for(&server).await.submit(&sample_work()).await;
    match result {
        Err(IngestError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_resolution_strips_fields_and_resubmits_once() {
    let server = MockServer::start().await;
    let work = sample_work();
    let payload = serde_json::to_value(&work).unwrap();

    // The stripped resubmission must not carry the conflicting fields.
    let mut stripped = payload.clone();
    stripped.as_object_mut().unwrap().remove("title");
    stripped.as_object_mut().unwrap().remove("producer");
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .and(query_param("merge", "1"))
        .and(body_json(&stripped))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "w-17"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prompt = StaticPrompt::new(true, None);
    let resolver = ConflictResolver::new(&client, &prompt);
    let fields = vec!["title".to_string(), "producer".to_string()];

    let resolution = resolver.resolve("ABC-123", &payload, &fields).await.unwrap();
    assert_eq!(
        resolution,
        Resolution::Resolved(Outcome::Updated {
            id: "w-17".to_string()
        })
    );
}

#[tokio::test]
async fn test_second_conflict_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/works/ABC-123")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "data": [{"field": "releaseDate"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prompt = StaticPrompt::new(true, None);
    let resolver = ConflictResolver::new(&client, &prompt);
    let payload = serde_json::to_value(sample_work()).unwrap();

    let resolution = resolver
        .resolve("ABC-123", &payload, &["releaseDate".to_string()])
        .await
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Unresolved {
            fields: vec!["releaseDate".to_string()]
        }
    );

    // Exactly one resubmission, never a third attempt.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_declined_resolution_sends_nothing() {
    let server = MockServer::start().await;

    let client = client_for(&server).await;
    let prompt = StaticPrompt::declining();
    let resolver = ConflictResolver::new(&client, &prompt);
    let payload = serde_json::to_value(sample_work()).unwrap();

    let resolution = resolver
        .resolve("ABC-123", &payload, &["title".to_string()])
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Declined);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_import_resources_returns_imported_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/works/ABC-123/resource/import")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let resources = vec![
        ResourceDescriptor::new("HD stream", "https://agg/play/1", None),
        ResourceDescriptor::new("Full rip", "magnet:?xt=urn:btih:abc", Some(1_610_612_736)),
    ];
    let imported = client_for(&server)
        .await
        .import_resources("ABC-123", &resources)
        .await;
    assert_eq!(imported.unwrap(), 2);
}

#[tokio::test]
async fn test_import_resources_rejection_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/works/ABC-123/resource/import")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 2, "message": "unknown work"})),
        )
        .mount(&server)
        .await;

    let resources = vec![ResourceDescriptor::new("x", "magnet:?xt=a", None)];
    let result = client_for(&server)
        .await
        .import_resources("ABC-123", &resources)
        .await;
    match result {
        Err(IngestError::ImportRejected { message }) => assert_eq!(message, "unknown work"),
        other => panic!("expected import rejection, got {other:?}"),
    }
}
