//! Router-level tests without a live database.
//!
//! The pool handle points at an unreachable address; everything exercised
//! here either never touches the database or degrades gracefully when the
//! connection is refused.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use citycontext_core::Settings;
use citycontext_llm::generator_for;
use citycontext_server::db::SharedPool;
use citycontext_server::{build_router, AppState};

fn test_router() -> axum::Router {
    let settings = Settings::default();
    let generator = generator_for(&settings);
    let state = AppState::new(
        SharedPool::new("postgres://nobody@localhost:1/none"),
        settings,
        generator,
    );
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_degrades_without_a_database() {
    let response = test_router()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["db"], "unreachable");
    assert_eq!(body["llm_mode"], "placeholder");
}

#[tokio::test]
async fn query_without_execution_returns_generated_sql() {
    let request = Request::post("/api/query")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"question": "how many buildings are there?", "execute": false}"#,
        ))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["mode"], "placeholder");
    assert_eq!(body["executed"], false);
    assert!(body["sql"].as_str().unwrap().starts_with("SELECT"));
    assert_eq!(body["error"], serde_json::Value::Null);
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let request = Request::post("/api/query")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"question": "   "}"#))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Question cannot be empty.");
}

#[tokio::test]
async fn malformed_bbox_is_rejected_before_the_database() {
    let response = test_router()
        .oneshot(
            Request::get("/api/buildings?bbox=139.8,35.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = test_router()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
