//! Wire-level behavior of the Ollama-compatible reasoning client.

mod common;

use common::clean_draft;
use loandesk_core::{
    config::{ReasoningConfig, RulePolicy},
    reasoning::{OllamaClient, ReasoningClient, ReasoningError, ReasoningRequest},
    rules::{evaluate, RuleSet},
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(ReasoningConfig {
        endpoint: server.uri(),
        ..ReasoningConfig::default()
    })
}

fn request_fixture() -> (loandesk_core::Application, loandesk_core::RuleVerdict) {
    let app = clean_draft("Wire Test").submit().unwrap();
    let verdict = evaluate(&app, &RuleSet::standard(&RulePolicy::default())).unwrap();
    (app, verdict)
}

#[tokio::test]
async fn takes_the_first_line_of_the_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3.2:3b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Stable income, low DTI\nIgnored second line"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, verdict) = request_fixture();
    let text = client_for(&server)
        .explain(ReasoningRequest {
            application: &app,
            verdict: &verdict,
            context: &[],
        })
        .await
        .unwrap();
    assert_eq!(text, "Stable income, low DTI");
}

#[tokio::test]
async fn server_errors_surface_as_backend_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (app, verdict) = request_fixture();
    let err = client_for(&server)
        .explain(ReasoningRequest {
            application: &app,
            verdict: &verdict,
            context: &[],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReasoningError::Backend { status: 500 }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  \n" })))
        .mount(&server)
        .await;

    let (app, verdict) = request_fixture();
    let err = client_for(&server)
        .explain(ReasoningRequest {
            application: &app,
            verdict: &verdict,
            context: &[],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReasoningError::EmptyCompletion));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let (app, verdict) = request_fixture();
    let err = client_for(&server)
        .explain(ReasoningRequest {
            application: &app,
            verdict: &verdict,
            context: &[],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReasoningError::Malformed(_)));
}
