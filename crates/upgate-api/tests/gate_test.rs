//! Identity gate behaviour as seen over HTTP.
//!
//! Run with: `cargo test -p upgate-api --test gate_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{bearer, setup_test_app};
use serde_json::{json, Value};

const PROTECTED: [(&str, &str); 5] = [
    ("POST", "/api/generate-direct-url"),
    ("POST", "/api/generate-signed-url"),
    ("POST", "/api/generate-post-url"),
    ("POST", "/api/generate-resumable-url"),
    ("GET", "/api/list-files"),
];

#[tokio::test]
async fn test_missing_authorization_header_is_rejected_everywhere() {
    let app = setup_test_app();

    for (method, path) in PROTECTED {
        let request = match method {
            "GET" => app.server.get(path),
            _ => app.server.post(path).json(&json!({"filename": "a.txt"})),
        };
        let response = request.await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", path);

        let body: Value = response.json();
        assert_eq!(body["error"], "Missing or invalid Authorization header");
        assert_eq!(
            body["hint"],
            "Include: Authorization: Bearer YOUR_FIREBASE_TOKEN"
        );
    }

    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_non_bearer_schemes_are_rejected() {
    let app = setup_test_app();

    for header in ["Basic YWxpY2U6cw==", "bearer alice", "Bearer ", "alice"] {
        let response = app
            .server
            .post("/api/generate-direct-url")
            .add_header("Authorization", header)
            .json(&json!({"filename": "a.txt"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", header);
        let body: Value = response.json();
        assert_eq!(body["error"], "Missing or invalid Authorization header");
    }

    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_expired_token() {
    let app = setup_test_app();

    let response = app
        .server
        .post("/api/generate-direct-url")
        .add_header("Authorization", bearer("expired"))
        .json(&json!({"filename": "a.txt"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Token has expired");
    assert_eq!(body["hint"], "Please sign in again to get a new token");
    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_each_verification_failure_has_its_own_message() {
    let app = setup_test_app();

    let cases = [
        ("revoked", "Token has been revoked"),
        ("broken", "Invalid token"),
        ("never-issued", "Invalid token"),
        ("jwks-down", "Authentication failed: key set unreachable"),
    ];

    for (token, expected) in cases {
        let response = app
            .server
            .get("/api/list-files")
            .add_header("Authorization", bearer(token))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", token);
        let body: Value = response.json();
        assert_eq!(body["error"], expected);
    }

    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_subject_that_is_not_a_path_segment_is_rejected() {
    let app = setup_test_app();

    for token in ["slashed", "dot-dot"] {
        let response = app
            .server
            .post("/api/generate-direct-url")
            .add_header("Authorization", bearer(token))
            .json(&json!({"filename": "a.txt"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{}", token);
        let body: Value = response.json();
        assert_eq!(body["error"], "Invalid token");
    }
    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_verified_but_not_allow_listed() {
    let app = setup_test_app();

    let response = app
        .server
        .post("/api/generate-post-url")
        .add_header("Authorization", bearer("outsider"))
        .json(&json!({"filename": "a.txt"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "Access Denied");
    assert_eq!(
        body["message"],
        "Email 'outsider@evil.com' is not authorized to access this application"
    );
    assert_eq!(body["hint"], "Contact the administrator to request access");

    // The allow-list itself never leaks
    let raw = response.text();
    assert!(!raw.contains("alice@example.com"));
    assert!(!raw.contains("second@example.com"));
    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_missing_email_claim_is_denied() {
    let app = setup_test_app();

    let response = app
        .server
        .get("/api/list-files")
        .add_header("Authorization", bearer("no-email"))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "Email 'unknown' is not authorized to access this application"
    );
}

#[tokio::test]
async fn test_allow_list_match_ignores_case() {
    let app = setup_test_app();

    let response = app
        .server
        .get("/api/list-files")
        .add_header("Authorization", bearer("alice-shouting"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app();

    for path in ["/", "/health"] {
        let response = app.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Signed URL Generator");
        assert_eq!(body["bucket"], "test-bucket");
        assert_eq!(body["endpoints"]["direct_url"], "/api/generate-direct-url");
        assert_eq!(body["endpoints"]["standard_signed_url"], "/api/generate-signed-url");
        assert_eq!(body["endpoints"]["list_files"], "/api/list-files");
    }

    assert_eq!(app.storage.calls(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_gated() {
    let app = setup_test_app();

    let response = app.server.get("/api/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
