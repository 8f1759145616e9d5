use axum::{
    body::Bytes,
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::alerts::StatsSnapshot;
use crate::error::ApiError;
use crate::middleware::request_id_layer;
use crate::state::AppState;
use crate::translate::{TranslateRequest, TranslateResponse};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/translate", post(translate_text))
        .route("/sos/alert", post(trigger_sos))
        .route("/admin/stats", get(get_stats))
        .route("/health", get(health_check))
}

/// Full application: routes, permissive CORS for every origin, and the
/// request id span around everything.
pub fn create_app(state: AppState) -> Router {
    create_routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_layer))
}

/// Rejects bodies that are not a JSON object or have no `text` key. The
/// value of `text` is not inspected here; an empty string is valid.
pub fn parse_translate_request(body: &[u8]) -> Result<TranslateRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected translate body: {}", e);
        ApiError::NoTextProvided
    })?;
    if !value.is_object() {
        debug!("Rejected translate body: not a JSON object");
        return Err(ApiError::NoTextProvided);
    }

    serde_json::from_value(value).map_err(|e| {
        debug!("Rejected translate body: {}", e);
        ApiError::NoTextProvided
    })
}

async fn translate_text(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranslateResponse>, ApiError> {
    // Model availability is checked before the body so a degraded service
    // answers the same way whatever the client sends.
    let translator = state.model.translator().ok_or(ApiError::ModelNotLoaded)?;
    let request = parse_translate_request(&body)?;

    if request.source_lang.is_some() || request.target_lang.is_some() {
        debug!(
            source_lang = ?request.source_lang,
            target_lang = ?request.target_lang,
            "Ignoring language hints, model is English to Kannada"
        );
    }

    let translated_text = match request.text() {
        Ok(text) => translator.translate(text).await,
        Err(e) => Err(e),
    }
    .map_err(|e| {
        error!("Translation error: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(TranslateResponse { translated_text }))
}

async fn trigger_sos(State(state): State<AppState>) -> Json<Value> {
    let total_alerts = state.alerts.trigger();
    info!(total_alerts, "SOS alert received");

    Json(json!({
        "status": "alert_received",
        "total_alerts": total_alerts
    }))
}

async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.alerts.snapshot())
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.model.is_loaded()
    }))
}
