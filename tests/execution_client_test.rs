use axum::{routing::post, Json, Router};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use assessment_backend::error::Error;
use assessment_backend::models::coding_question::TestCase;
use assessment_backend::services::execution_client::ExecutionClient;
use assessment_backend::test_support::serve_stub;

fn cases() -> Vec<TestCase> {
    vec![
        TestCase { input: "1 2".into(), expected_output: "3".into() },
        TestCase { input: "5 7".into(), expected_output: "12".into() },
    ]
}

fn client(base_url: &str) -> ExecutionClient {
    ExecutionClient::new(
        reqwest::Client::new(),
        format!("{}/execute", base_url),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn returns_ordered_outcomes_from_a_healthy_service() {
    let stub = Router::new().route(
        "/execute",
        post(|Json(req): Json<JsonValue>| async move {
            // Echo the submitted cases back as alternating pass/fail.
            let results: Vec<JsonValue> = req["test_cases"]
                .as_array()
                .unwrap()
                .iter()
                .enumerate()
                .map(|(i, case)| {
                    json!({
                        "input": case["input"],
                        "expected_output": case["expected_output"],
                        "actual_output": if i == 0 { "3" } else { "99" },
                        "passed": i == 0,
                        "errors": [],
                        "exit_code": 0,
                        "execution_time": 0.01,
                    })
                })
                .collect();
            Json(json!({ "results": results }))
        }),
    );
    let base_url = serve_stub(stub).await;

    let outcomes = client(&base_url)
        .run("python", "print(input())", &cases())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].passed);
    assert!(!outcomes[1].passed);
    assert_eq!(outcomes[0].actual_output, "3");
}

#[tokio::test]
async fn non_2xx_status_maps_to_execution_unavailable() {
    let stub = Router::new().route(
        "/execute",
        post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = serve_stub(stub).await;

    let err = client(&base_url)
        .run("python", "print(1)", &cases())
        .await
        .unwrap_err();

    match err {
        Error::ExecutionUnavailable(msg) => {
            assert!(msg.contains("500"), "diagnostic should carry status: {}", msg);
            assert!(msg.contains("boom"), "diagnostic should carry body: {}", msg);
        }
        other => panic!("expected ExecutionUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_maps_to_execution_unavailable() {
    let stub = Router::new().route(
        "/execute",
        post(|| async { Json(json!({ "unexpected": true })) }),
    );
    let base_url = serve_stub(stub).await;

    let err = client(&base_url)
        .run("python", "print(1)", &cases())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExecutionUnavailable(_)));
}

#[tokio::test]
async fn unreachable_service_maps_to_execution_unavailable() {
    // Port 9 (discard) is not listening.
    let client = ExecutionClient::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9/execute".to_string(),
        Duration::from_millis(500),
    );
    let err = client.run("python", "print(1)", &cases()).await.unwrap_err();
    assert!(matches!(err, Error::ExecutionUnavailable(_)));
}
