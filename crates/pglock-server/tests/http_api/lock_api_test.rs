//! Lock API tests against a memory-backed coordinator

use std::time::Duration;

use actix_web::{http::StatusCode, test};
use serde_json::Value;

use crate::common::TestContext;

struct Step {
    method: &'static str,
    json: &'static str,
    expected_status: u16,
}

const fn step(method: &'static str, json: &'static str, expected_status: u16) -> Step {
    Step {
        method,
        json,
        expected_status,
    }
}

fn lock_request(method: &str, json: &str) -> test::TestRequest {
    let request = match method {
        "POST" => test::TestRequest::post(),
        "DELETE" => test::TestRequest::delete(),
        other => panic!("unsupported method {other}"),
    };
    request
        .uri("/v1/lock")
        .insert_header(("content-type", "application/json"))
        .set_payload(json.to_string())
}

#[actix_web::test]
async fn test_locking_cases() {
    let cases: Vec<(&str, Vec<Step>)> = vec![
        (
            "The same lock for the same device ID is always successful",
            vec![
                step("POST", r#"{"profileId":"1", "deviceId":"1"}"#, 200),
                step("POST", r#"{"profileId":"1", "deviceId":"1"}"#, 200),
                step("POST", r#"{"profileId":"1", "deviceId":"1"}"#, 200),
            ],
        ),
        (
            "Locking multiple devices returns 400 until unlocked",
            vec![
                step("POST", r#"{"profileId":"2", "deviceId":"2"}"#, 200),
                step("POST", r#"{"profileId":"2", "deviceId":"3"}"#, 400),
                step("DELETE", r#"{"profileId":"2"}"#, 200),
                step("POST", r#"{"profileId":"2", "deviceId":"3"}"#, 200),
            ],
        ),
        (
            "Unlock a non-existing lock results in 404",
            vec![step("DELETE", r#"{"profileId":"0"}"#, 404)],
        ),
        (
            "Unlock by device only releases its own lock",
            vec![
                step("POST", r#"{"profileId":"4", "deviceId":"4"}"#, 200),
                step("DELETE", r#"{"profileId":"4", "deviceId":"5"}"#, 404),
                step("POST", r#"{"profileId":"4", "deviceId":"5"}"#, 400),
                step("DELETE", r#"{"profileId":"4", "deviceId":"4"}"#, 200),
                step("POST", r#"{"profileId":"4", "deviceId":"5"}"#, 200),
            ],
        ),
    ];

    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    for (description, steps) in cases {
        for (i, step) in steps.iter().enumerate() {
            let req = lock_request(step.method, step.json).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(
                resp.status().as_u16(),
                step.expected_status,
                "{description}: step {i} ({} {})",
                step.method,
                step.json
            );
        }
    }
}

#[actix_web::test]
async fn test_lock_expiry() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    let req = lock_request("POST", r#"{"profileId":"10", "deviceId":"10"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = lock_request("POST", r#"{"profileId":"10", "deviceId":"11"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    ctx.advance(8);

    let req = lock_request("POST", r#"{"profileId":"10", "deviceId":"11"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = lock_request("POST", r#"{"profileId":"10", "deviceId":"10"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_granted_response_body() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    let req = lock_request("POST", r#"{"profileId":"p", "deviceId":"d"}"#).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["profileId"], "p");
    assert_eq!(body["deviceId"], "d");
    assert_eq!(body["ttl"], 5);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    for method in ["POST", "DELETE"] {
        let req = lock_request(method, r#"{"profileId": "#).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 400);
        assert_eq!(body["path"], "/v1/lock");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Can't parse Lock request: ")
        );
    }
}

#[actix_web::test]
async fn test_body_without_content_type_is_accepted() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    let req = test::TestRequest::post()
        .uri("/v1/lock")
        .set_payload(r#"{"profileId":"1", "deviceId":"1"}"#)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_missing_ids_are_bad_request() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    for (method, json) in [
        ("POST", r#"{"deviceId":"1"}"#),
        ("POST", r#"{"profileId":"1"}"#),
        ("POST", r#"{"profileId":"", "deviceId":"1"}"#),
        ("DELETE", r#"{}"#),
    ] {
        let req = lock_request(method, json).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{method} {json}");
    }
    assert!(ctx.store.is_empty());
}

#[actix_web::test]
async fn test_release_keeps_lease_row() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    let req = lock_request("POST", r#"{"profileId":"2", "deviceId":"2"}"#).to_request();
    test::call_service(&app, req).await;
    let req = lock_request("DELETE", r#"{"profileId":"2"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    assert_eq!(ctx.store.len(), 1);

    // A second release still finds the row
    let req = lock_request("DELETE", r#"{"profileId":"2"}"#).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_lock_status() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    let req = test::TestRequest::get().uri("/v1/lock/7").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = lock_request("POST", r#"{"profileId":"7", "deviceId":"9"}"#).to_request();
    test::call_service(&app, req).await;
    ctx.advance(2);

    let req = test::TestRequest::get().uri("/v1/lock/7").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["profileId"], "7");
    assert_eq!(body["deviceId"], "9");
    assert_eq!(body["live"], true);
    assert_eq!(body["remainingTtl"], 3);

    ctx.advance(10);
    let req = test::TestRequest::get().uri("/v1/lock/7").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["live"], false);
    assert_eq!(body["remainingTtl"], 0);
}

#[actix_web::test]
async fn test_store_outage_is_service_unavailable() {
    let ctx = TestContext::new(Duration::from_secs(5));
    let app = init_app!(ctx.app_state.clone());

    ctx.store.fail_with("connection refused");

    let req = lock_request("POST", r#"{"profileId":"1", "deviceId":"1"}"#).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Service Unavailable");

    let req = lock_request("DELETE", r#"{"profileId":"1"}"#).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let req = test::TestRequest::get().uri("/v1/health").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    ctx.store.restore();

    let req = test::TestRequest::get().uri("/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "UP");
}
