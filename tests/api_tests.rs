//! End-to-end tests for the HTTP API, driving the router in-process.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use kannada_backend::middleware::REQUEST_ID_HEADER;
use kannada_backend::translate::{ModelState, TranslationError, Translator};
use kannada_backend::{create_app, AppState};

/// Stand-in model that tags its input so responses are predictable
struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        Ok(format!("kn:{}", text))
    }

    fn describe(&self) -> String {
        "echo".to_string()
    }
}

struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _text: &str) -> Result<String, TranslationError> {
        Err(TranslationError::Model("sequence too long for model".to_string()))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

fn app_with(model: ModelState) -> Router {
    create_app(AppState::new(model))
}

fn loaded_app() -> Router {
    app_with(ModelState::loaded(EchoTranslator))
}

fn degraded_app() -> Router {
    app_with(ModelState::unloaded("Model directory not found: ./model"))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

mod translate {
    use super::*;

    #[tokio::test]
    async fn translates_text_with_loaded_model() {
        let app = loaded_app();
        let (status, body) = send(&app, post_json("/translate", r#"{"text": "Help is coming"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"translated_text": "kn:Help is coming"}));
    }

    #[tokio::test]
    async fn empty_text_is_forwarded() {
        let app = loaded_app();
        let (status, body) = send(&app, post_json("/translate", r#"{"text": ""}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translated_text"], "kn:");
    }

    #[tokio::test]
    async fn language_hints_are_ignored() {
        let app = loaded_app();
        let request = post_json(
            "/translate",
            r#"{"text": "water", "source_lang": "en", "target_lang": "fr"}"#,
        );
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translated_text"], "kn:water");
    }

    #[tokio::test]
    async fn missing_text_is_bad_request() {
        let app = loaded_app();
        for payload in ["{}", "", r#"{"message": "hi"}"#, r#"[1, 2]"#] {
            let (status, body) = send(&app, post_json("/translate", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload {:?}", payload);
            assert_eq!(body, json!({"error": "No text provided"}));
        }
    }

    #[tokio::test]
    async fn non_string_text_fails_like_a_model_error() {
        let app = loaded_app();
        for (payload, message) in [
            (r#"{"text": null}"#, "Expected text to be a string, got null"),
            (r#"{"text": 42}"#, "Expected text to be a string, got a number"),
        ] {
            let (status, body) = send(&app, post_json("/translate", payload)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "payload {:?}", payload);
            assert_eq!(body, json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn unloaded_model_fails_regardless_of_body() {
        let app = degraded_app();
        for payload in [r#"{"text": "hello"}"#, "{}", "garbage"] {
            let (status, body) = send(&app, post_json("/translate", payload)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "payload {:?}", payload);
            assert_eq!(body, json!({"error": "Translator model not loaded"}));
        }
    }

    #[tokio::test]
    async fn model_failure_message_is_surfaced() {
        let app = app_with(ModelState::loaded(FailingTranslator));
        let (status, body) = send(&app, post_json("/translate", r#"{"text": "hello"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "sequence too long for model"}));
    }

    #[tokio::test]
    async fn get_is_not_routed() {
        let app = loaded_app();
        let response = app.oneshot(get("/translate")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

mod alerts {
    use super::*;

    #[tokio::test]
    async fn stats_start_empty() {
        let app = loaded_app();
        let (status, body) = send(&app, get("/admin/stats")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"totalSOS": 0, "lastSOS": "N/A", "nodeStatus": "Active"}));
    }

    #[tokio::test]
    async fn each_alert_reports_running_total() {
        let app = loaded_app();
        for n in 1..=5 {
            let (status, body) = send(&app, post_json("/sos/alert", "")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "alert_received", "total_alerts": n}));
        }

        let (_, stats) = send(&app, get("/admin/stats")).await;
        assert_eq!(stats, json!({"totalSOS": 5, "lastSOS": "Just now", "nodeStatus": "Active"}));
    }

    #[tokio::test]
    async fn alert_payload_is_ignored() {
        let app = loaded_app();
        let (status, body) = send(&app, post_json("/sos/alert", r#"{"location": "gate 4"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_alerts"], 1);
    }

    #[tokio::test]
    async fn alerts_work_in_degraded_mode() {
        let app = degraded_app();
        let (status, body) = send(&app, post_json("/sos/alert", "")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_alerts"], 1);
    }

    #[tokio::test]
    async fn reading_stats_and_health_has_no_side_effects() {
        let app = loaded_app();
        send(&app, post_json("/sos/alert", "")).await;
        for _ in 0..3 {
            send(&app, get("/admin/stats")).await;
            send(&app, get("/health")).await;
        }

        let (_, stats) = send(&app, get("/admin/stats")).await;
        assert_eq!(stats["totalSOS"], 1);
    }

    #[tokio::test]
    async fn concurrent_alerts_are_all_counted() {
        let app = loaded_app();
        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move { send(&app, post_json("/sos/alert", "")).await })
            })
            .collect();

        let mut totals = Vec::new();
        for task in tasks {
            let (status, body) = task.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            totals.push(body["total_alerts"].as_u64().unwrap());
        }
        totals.sort_unstable();
        assert_eq!(totals, (1..=50).collect::<Vec<u64>>());

        let (_, stats) = send(&app, get("/admin/stats")).await;
        assert_eq!(stats["totalSOS"], 50);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_loaded_model() {
        let (status, body) = send(&loaded_app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "model_loaded": true}));
    }

    #[tokio::test]
    async fn reports_degraded_mode() {
        let (status, body) = send(&degraded_app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "model_loaded": false}));
    }
}

mod transport {
    use super::*;

    #[tokio::test]
    async fn any_origin_is_allowed() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://dashboard.example")
            .body(Body::empty())
            .unwrap();
        let response = loaded_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn preflight_is_answered() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/translate")
            .header(header::ORIGIN, "http://dashboard.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = loaded_app().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = loaded_app().oneshot(get("/health")).await.unwrap();
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = loaded_app().oneshot(get("/admin/reset")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
