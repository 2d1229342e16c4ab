use crate::error::RelayError;
use crate::handoff::{HandoffCoordinator, PollOutcome, SessionHandles};
use crate::types::{CardRecord, CardType};
use axum::{
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use base64::{engine::general_purpose, Engine as _};
use hyper::Server;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::SessionNotFound => StatusCode::NOT_FOUND,
            RelayError::SessionExpired => StatusCode::GONE,
            RelayError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::Qr(_)
            | RelayError::Config(_)
            | RelayError::Toml(_)
            | RelayError::Json(_)
            | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "ok": false,
            "error": self.category(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "card-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreatedResponse {
    ok: bool,
    session_id: String,
    mobile_url: String,
    desktop_url: String,
    qr_code: String,
    expires_in_sec: i64,
}

impl From<SessionHandles> for SessionCreatedResponse {
    fn from(handles: SessionHandles) -> Self {
        Self {
            ok: true,
            session_id: handles.session_id,
            mobile_url: handles.mobile_url,
            desktop_url: handles.desktop_url,
            qr_code: handles.qr_code,
            expires_in_sec: handles.expires_in_sec,
        }
    }
}

async fn create_session(
    Extension(coordinator): Extension<Arc<HandoffCoordinator>>,
) -> Result<Json<SessionCreatedResponse>, RelayError> {
    let handles = coordinator.create_session()?;
    Ok(Json(handles.into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanRequest {
    session_id: Option<String>,
    image_base64: Option<String>,
}

/// Fields echoed to the uploading device. Deliberately excludes the full
/// card number.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanData {
    masked_card_number: String,
    cardholder_name: String,
    expiry_date: String,
    card_type: CardType,
}

impl From<&CardRecord> for ScanData {
    fn from(record: &CardRecord) -> Self {
        Self {
            masked_card_number: record.masked_card_number.clone(),
            cardholder_name: record.cardholder_name.clone(),
            expiry_date: record.expiry_date.clone(),
            card_type: record.card_type,
        }
    }
}

async fn submit_scan(
    Extension(coordinator): Extension<Arc<HandoffCoordinator>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<serde_json::Value>, RelayError> {
    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RelayError::InvalidInput("sessionId is required".to_string()))?;
    let image_base64 = req
        .image_base64
        .filter(|img| !img.is_empty())
        .ok_or_else(|| RelayError::InvalidInput("imageBase64 is required".to_string()))?;
    let image = general_purpose::STANDARD
        .decode(image_base64.as_bytes())
        .map_err(|e| RelayError::InvalidInput(format!("invalid image encoding: {e}")))?;

    let record = coordinator.handle_upload(&session_id, &image).await?;
    Ok(Json(json!({
        "ok": true,
        "message": "card captured",
        "data": ScanData::from(&record),
    })))
}

async fn poll_session(
    Extension(coordinator): Extension<Arc<HandoffCoordinator>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, RelayError> {
    match coordinator.poll(&session_id)? {
        PollOutcome::Pending => Ok(Json(json!({"ok": true, "status": "pending"}))),
        PollOutcome::Ready(record) => Ok(Json(json!({
            "ok": true,
            "status": "ready",
            "data": record,
        }))),
    }
}

async fn diagnostics(
    Extension(coordinator): Extension<Arc<HandoffCoordinator>>,
) -> impl IntoResponse {
    let diag = coordinator.diagnostics();
    Json(json!({
        "ok": true,
        "activeSessions": diag.active_sessions,
        "baseUrl": diag.base_url,
    }))
}

/// Create the HTTP server with all routes
pub fn create_server(coordinator: Arc<HandoffCoordinator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(poll_session))
        .route("/api/scan", post(submit_scan))
        .route("/api/diagnostics", get(diagnostics))
        .layer(Extension(coordinator))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    coordinator: Arc<HandoffCoordinator>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(coordinator);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
