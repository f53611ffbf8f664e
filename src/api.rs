//! HTTP transport for the registry node.
//!
//! Every route maps one-to-one onto a [`Node`] operation. Request bodies are
//! decoded by hand so malformed JSON surfaces as a `DecodeError` (400).

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Chain(e) => match e {
                ChainError::NotFound(_) => StatusCode::NOT_FOUND,
                ChainError::StaleOrKnown { .. } => StatusCode::CONFLICT,
                ChainError::NetworkError(_) | ChainError::ConfigError(_) | ChainError::IoError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Chain(e) => e.to_string(),
            ApiError::InvalidInput(msg) => msg,
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub message: String,
    pub height: u64,
}

#[derive(Deserialize)]
struct NameQuery {
    name: Option<String>,
}

#[derive(Deserialize)]
struct AddressQuery {
    address: Option<String>,
}

fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidInput(format!("{} required", what)))
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &[u8], what: &str) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ChainError::DecodeError(format!("invalid {}: {}", what, e)).into())
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        node = %node.node_id(),
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used by tests).
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![http::Method::GET, http::Method::POST])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/register", post(register))
        .route("/lookup", get(lookup))
        .route("/nonce", get(nonce))
        .route("/chain", get(chain))
        .route("/receive-block", post(receive_block))
        .route("/health", get(health_check))
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn serve(node: Arc<Node>, listener: TcpListener) -> Result<(), ChainError> {
    axum::serve(listener, build_api_router(node))
        .await
        .map_err(|e| ChainError::NetworkError(format!("API server failed: {}", e)))
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn register(
    State(node): State<Arc<Node>>,
    body: Bytes,
) -> Result<Json<RegisterResponse>, ApiError> {
    let tx: Transaction = decode_body(&body, "JSON body")?;
    let block = node.submit_transaction(tx).await?;

    Ok(Json(RegisterResponse {
        message: "Transaction accepted and added to block".to_string(),
        block,
    }))
}

async fn lookup(
    State(node): State<Arc<Node>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let name = required(query.name, "name")?;
    let address = node.lookup(&name).await?;
    Ok(Json(LookupResponse { name, address }))
}

async fn nonce(
    State(node): State<Arc<Node>>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<NonceResponse>, ApiError> {
    let address = required(query.address, "address")?;
    Ok(Json(NonceResponse {
        nonce: node.nonce_of(&address).await,
    }))
}

async fn chain(State(node): State<Arc<Node>>) -> Json<Vec<Block>> {
    Json(node.blocks().await)
}

async fn receive_block(
    State(node): State<Arc<Node>>,
    body: Bytes,
) -> Result<Json<AcceptResponse>, ApiError> {
    let block: Block = decode_body(&body, "block data")?;
    let height = node.receive_block(block).await?;

    Ok(Json(AcceptResponse {
        message: "Block accepted".to_string(),
        height,
    }))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_id(),
        "height": node.height().await,
        "uptime_seconds": node.uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
