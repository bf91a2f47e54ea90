mod auth;
mod error;
mod graph;

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{any, get, post, put};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};

use txgraph_core::cache::Cache;
use txgraph_core::codec::TxCodec;
use txgraph_core::graph::SharedGraph;
use txgraph_core::layout::LayoutConfig;
use txgraph_core::lookup::TxLookup;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub lookup: Arc<dyn TxLookup>,
    pub codec: Arc<dyn TxCodec>,
    pub cache: Arc<Cache>,
    pub graph: SharedGraph,
    pub api_token: String,
    pub layout: LayoutConfig,
    /// Horizontal center used when a request does not name one.
    pub screen_center_x: f64,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState, origin: HeaderValue) -> Router {
    // Only reflect the allowed origin when the request's Origin header
    // actually matches; otherwise browsers get a clean CORS rejection.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &HeaderValue, _| *request_origin == origin,
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(auth::API_TOKEN_HEADER),
        ]);

    let shared = Arc::new(state);

    let public_api = Router::new().route("/api/v1/health", get(health));

    let protected_api = Router::new()
        .route(
            "/api/v1/graph",
            get(graph::get_graph).delete(graph::reset_graph),
        )
        .route("/api/v1/graph/tx", post(graph::add_transaction))
        .route("/api/v1/graph/tx/{hash}/summary", get(graph::get_summary))
        .route("/api/v1/graph/tx/{hash}/alias", put(graph::set_alias))
        .route(
            "/api/v1/graph/tx/{hash}/layout",
            post(graph::relayout_transaction),
        )
        .route(
            "/api/v1/graph/tx/{hash}/position",
            post(graph::drag_transaction),
        )
        .route(
            "/api/v1/graph/utxo/{utxo_hash}/position",
            post(graph::drag_utxo),
        )
        .route("/api/v1/graph/utxo/{utxo_hash}/lines", put(graph::set_lines));

    Router::new()
        .merge(public_api)
        .merge(protected_api)
        .route("/api", any(api_not_found))
        .route("/api/{*path}", any(api_not_found))
        .layer(cors)
        .with_state(shared)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("API route not found".to_string())
}
