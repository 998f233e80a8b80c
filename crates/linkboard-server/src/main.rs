//! Linkboard Links API Server
//!
//! An in-memory reference implementation of the links API the board client
//! syncs against. Every route under `/api` requires a bearer token.
//!
//! ## Routes
//!
//! ```text
//! GET    /api/boards/{board_id}/links
//! POST   /api/boards/{board_id}/links                 { "url": "..." }
//! DELETE /api/links/{id}
//! PATCH  /api/links/{id}                              { "x": 1, "width": 2, ... }
//! PATCH  /api/links/{id}/position?x=&y=
//! PATCH  /api/links/{id}/dimensions?width=&height=
//! PATCH  /api/links/{id}/position-dimensions?x=&y=&width=&height=
//! GET    /health
//! ```

use axum::{
    extract::{Path, Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use dashmap::DashMap;
use linkboard_core::{Link, LinkId, LinkPatch, LinkRecord};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Error returned by a handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
enum ApiError {
    Unauthorized,
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Missing bearer token".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CreateLinkRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PositionQuery {
    x: i64,
    y: i64,
}

#[derive(Debug, Deserialize)]
struct DimensionsQuery {
    width: i64,
    height: i64,
}

#[derive(Debug, Deserialize)]
struct PositionDimensionsQuery {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

/// Shared application state
#[derive(Default)]
struct AppState {
    /// Every link, by id
    links: DashMap<LinkId, LinkRecord>,
    /// Link ids per board, in creation order
    boards: DashMap<String, Vec<LinkId>>,
}

type SharedState = Arc<AppState>;

impl AppState {
    fn list(&self, board_id: &str) -> Vec<LinkRecord> {
        let Some(ids) = self.boards.get(board_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.links.get(id).map(|l| l.clone()))
            .collect()
    }

    fn create(&self, board_id: &str, url: &str) -> LinkRecord {
        let id = Uuid::new_v4().to_string();
        let record = Link::new(id.clone(), board_id, url).to_record();
        self.links.insert(id.clone(), record.clone());
        self.boards.entry(board_id.to_string()).or_default().push(id);
        record
    }

    fn delete(&self, link_id: &str) -> Result<(), ApiError> {
        let (_, record) = self
            .links
            .remove(link_id)
            .ok_or_else(|| ApiError::NotFound(format!("Link {} not found", link_id)))?;
        if let Some(mut ids) = self.boards.get_mut(&record.board_id) {
            ids.retain(|id| id != link_id);
        }
        Ok(())
    }

    /// Apply a geometry update: x,y clamped to zero, sizes must be positive,
    /// stored values rounded to whole units.
    fn update(&self, link_id: &str, patch: LinkPatch) -> Result<LinkRecord, ApiError> {
        let invalid = |v: Option<f64>| v.is_some_and(|v| !(v.is_finite() && v > 0.0));
        if invalid(patch.width) || invalid(patch.height) {
            return Err(ApiError::BadRequest(
                "width and height must be positive".to_string(),
            ));
        }

        let mut record = self
            .links
            .get_mut(link_id)
            .ok_or_else(|| ApiError::NotFound(format!("Link {} not found", link_id)))?;
        let mut link = Link::from_record(record.clone());
        link.apply(&patch);
        link.x = link.x.round();
        link.y = link.y.round();
        link.width = link.width.round();
        link.height = link.height.round();
        *record = link.to_record();
        Ok(record.clone())
    }
}

fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/boards/{board_id}/links", get(list_links).post(create_link))
        .route("/links/{id}", patch(update_link).delete(delete_link))
        .route("/links/{id}/position", patch(update_position))
        .route("/links/{id}/dimensions", patch(update_dimensions))
        .route("/links/{id}/position-dimensions", patch(update_position_dimensions))
        .route_layer(middleware::from_fn(require_bearer));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkboard_server=info,tower_http=info".into()),
        )
        .init();

    let addr = listen_addr(std::env::var("LINKBOARD_SERVER_ADDR").ok().as_deref());
    let app = build_router(Arc::new(AppState::default()));

    info!("Linkboard API server listening on {}", addr);
    info!("API base: http://{}/api", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

fn listen_addr(configured: Option<&str>) -> SocketAddr {
    let default = SocketAddr::from(([0, 0, 0, 0], 8080));
    match configured.map(str::parse::<SocketAddr>) {
        Some(Ok(addr)) => addr,
        Some(Err(e)) => {
            warn!("Invalid LINKBOARD_SERVER_ADDR, using {}: {}", DEFAULT_ADDR, e);
            default
        }
        None => default,
    }
}

/// Reject requests without a non-empty bearer token.
async fn require_bearer(request: Request, next: Next) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn list_links(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
) -> Json<Vec<LinkRecord>> {
    Json(state.list(&board_id))
}

async fn create_link(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkRecord>), ApiError> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }
    let record = state.create(&board_id, url);
    info!("Created link {} on board {}", record.id, board_id);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_link(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.delete(&id)?;
    info!("Deleted link {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn update_link(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<LinkPatch>,
) -> Result<Json<LinkRecord>, ApiError> {
    Ok(Json(state.update(&id, patch)?))
}

async fn update_position(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<LinkRecord>, ApiError> {
    let patch = LinkPatch::position(q.x as f64, q.y as f64);
    Ok(Json(state.update(&id, patch)?))
}

async fn update_dimensions(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(q): Query<DimensionsQuery>,
) -> Result<Json<LinkRecord>, ApiError> {
    let patch = LinkPatch::dimensions(q.width as f64, q.height as f64);
    Ok(Json(state.update(&id, patch)?))
}

async fn update_position_dimensions(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(q): Query<PositionDimensionsQuery>,
) -> Result<Json<LinkRecord>, ApiError> {
    let patch = LinkPatch::full(q.x as f64, q.y as f64, q.width as f64, q.height as f64);
    Ok(Json(state.update(&id, patch)?))
}
