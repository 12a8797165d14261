use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Uri;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use crate::ops::action::Coordinates;
use crate::ops::analysis::{self, NearbyPin};
use crate::ops::chat::{self, ChatReply};
use crate::ops::coalesce::{self, ChatMessage};
use crate::ops::prompt::{self, AuditContext, RefiningIdea};
use crate::ops::reports::{self, REPORTS_URL_PREFIX, SavedReport};
use crate::server::errors::AppError;
use crate::server::state::AppState;

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

pub fn build_routes(state: AppState) -> Router {
    let reports = ServeDir::new(&state.inner.reports_dir);

    Router::new()
        // Health
        .route("/api/health", get(health))
        // Auditor chat
        .route("/api/chat", post(chat_handler))
        // Deep analysis
        .route("/api/location-analysis", post(location_analysis))
        // Reports
        .route("/api/reports/save", post(save_report))
        .nest_service(REPORTS_URL_PREFIX, reports)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = chrono::Utc::now() - state.inner.started_at;

    Json(json!({
        "status": "ok",
        "model": state.inner.model.model_id(),
        "places_lookup": state.inner.places.is_some(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    messages: Option<Vec<ChatMessage>>,
    location: Option<Coordinates>,
    place_name: Option<String>,
    refining_idea: Option<RefiningIdea>,
    force_validate: Option<bool>,
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(body) = body?;
    let messages = body
        .messages
        .ok_or_else(|| AppError::BadRequest("Invalid messages array".into()))?;

    let conversation = coalesce::coalesce(&messages)?;

    let system_instruction = prompt::build_system_instruction(&AuditContext {
        place_name: body.place_name.as_deref(),
        location: body.location,
        refining_idea: body.refining_idea.as_ref(),
        force_validate: body.force_validate.unwrap_or(false),
    });

    let reply = chat::respond(
        state.inner.model.as_ref(),
        conversation,
        system_instruction,
        body.location,
    )
    .await;

    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// Location analysis
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest {
    lat: Option<f64>,
    lng: Option<f64>,
    nearby_pins: Option<Vec<NearbyPin>>,
}

fn require_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<(f64, f64), AppError> {
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(AppError::BadRequest("Missing coordinates".into()));
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::BadRequest(format!(
            "Coordinates out of range: {}, {}",
            lat, lng
        )));
    }
    Ok((lat, lng))
}

async fn location_analysis(
    State(state): State<AppState>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body?;
    let (lat, lng) = require_coordinates(body.lat, body.lng)?;
    let pins = body.nearby_pins.unwrap_or_default();

    let report = analysis::analyze_location(
        state.inner.model.as_ref(),
        state.inner.places.as_deref(),
        lat,
        lng,
        &pins,
    )
    .await?;

    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveReportRequest {
    pdf_base64: Option<String>,
    filename: Option<String>,
}

async fn save_report(
    State(state): State<AppState>,
    body: Result<Json<SaveReportRequest>, JsonRejection>,
) -> Result<Json<SavedReport>, AppError> {
    let Json(body) = body?;
    let saved = reports::save_report(
        &state.inner.reports_dir,
        body.pdf_base64.as_deref().unwrap_or(""),
        body.filename.as_deref().unwrap_or(""),
    )
    .await?;

    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_required() {
        assert!(matches!(require_coordinates(None, Some(1.0)), Err(AppError::BadRequest(_))));
        assert!(matches!(require_coordinates(Some(1.0), None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn zero_is_a_valid_coordinate() {
        assert_eq!(require_coordinates(Some(0.0), Some(0.0)).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(require_coordinates(Some(91.0), Some(0.0)).is_err());
        assert!(require_coordinates(Some(0.0), Some(-180.5)).is_err());
    }
}
