//! Shared fixtures for route tests: stub upstreams and a request helper.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use zonify_server::llm::{GenerateRequest, GenerativeModel, LlmError};
use zonify_server::places::{Place, PlacesError, PlacesLookup};
use zonify_server::server::{self, state::AppState};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// ── Stub model ───────────────────────────────────────────────────────

pub enum Script {
    Reply(String),
    Fail,
}

/// Model that returns a fixed reply and records every request it sees.
pub struct StubModel {
    script: Script,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl StubModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Reply(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> GenerateRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("model was never called")
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    fn model_id(&self) -> &str {
        "stub-model"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(LlmError::Api {
                status: 503,
                body: "model overloaded".to_string(),
            }),
        }
    }
}

// ── Stub places ──────────────────────────────────────────────────────

pub struct StubPlaces {
    pub result: Result<Vec<Place>, u16>,
}

#[async_trait]
impl PlacesLookup for StubPlaces {
    async fn nearby(&self, _lat: f64, _lng: f64) -> Result<Vec<Place>, PlacesError> {
        self.result.clone().map_err(PlacesError::Api)
    }
}

pub fn place(name: &str, types: &[&str]) -> Place {
    Place {
        name: name.to_string(),
        types: types.iter().map(|t| t.to_string()).collect(),
    }
}

// ── App + requests ───────────────────────────────────────────────────

pub fn app_with(
    model: Arc<StubModel>,
    places: Option<Arc<dyn PlacesLookup>>,
    reports_dir: &Path,
) -> Router {
    let state = AppState::new(model, places, reports_dir.to_path_buf());
    server::app(state, MAX_BODY_BYTES)
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, serde_json::to_string(body).unwrap()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get_bytes(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}
