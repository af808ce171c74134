//! HTTP API gateway for Parley.
//!
//! Exposes REST endpoints for health checks, pairing, the chat pipeline,
//! and conversation management.
//!
//! Built on Axum. Security layers applied:
//! - Pairing-code → bearer-token authentication; each token is bound to a
//!   generated owner ID that scopes every store operation
//! - Request body size limit (1 MB)
//! - In-memory sliding-window rate limiting (60 req/min per client)
//! - CORS with a restrictive origin policy
//! - HTTP trace logging
//!
//! Chat failures use the uniform `{ "success": false, "error": ... }`
//! envelope with HTTP 200 — callers branch on `success`, not status codes.

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{middleware, Router};
use chrono::{DateTime, Utc};
use parley_core::message::{ConversationId, Turn};
use parley_core::ChatStore;
use parley_pipeline::{ChatPipeline, ChatRequest, ModeFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: parley_config::AppConfig,
    pub pairing_code: Option<String>,
    /// Bearer token → owner ID
    pub sessions: RwLock<HashMap<String, String>>,
    pub pipeline: Arc<ChatPipeline>,
    pub store: Arc<dyn ChatStore>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes and layers.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::exact(
            "http://localhost:8080".parse().unwrap(),
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    let rate_limiter = Arc::new(RateLimiter::new(60, std::time::Duration::from_secs(60)));

    Router::new()
        .route("/health", get(health_handler))
        .route("/pair", post(pair_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/conversations", get(list_conversations_handler))
        .route("/v1/conversations", post(create_conversation_handler))
        .route(
            "/v1/conversations/{id}",
            axum::routing::patch(rename_conversation_handler),
        )
        .route(
            "/v1/conversations/{id}",
            axum::routing::delete(delete_conversation_handler),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: parley_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr = format!("{host}:{port}");

    let pairing_code = if config.gateway.require_pairing {
        let code = format!("{:08}", rand_code());
        info!(code = %code, "Pairing code generated — use POST /pair with X-Pairing-Code header");
        Some(code)
    } else {
        None
    };

    let capabilities = parley_providers::build_from_config(&config);

    let store: Arc<dyn ChatStore> = match config.store.backend.as_str() {
        "in_memory" => Arc::new(parley_store::InMemoryStore::new()),
        _ => {
            let path = config.store_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(
                parley_store::SqliteStore::new(&format!("sqlite://{}", path.display())).await?,
            )
        }
    };

    let pipeline = Arc::new(
        ChatPipeline::new(
            capabilities.completion,
            capabilities.classifier,
            capabilities.search,
            store.clone(),
            &config.default_model,
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens),
    );

    let state = Arc::new(GatewayState {
        config,
        pairing_code,
        sessions: RwLock::new(HashMap::new()),
        pipeline,
        store,
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve the requesting principal from the Authorization header.
///
/// Before any token has been paired the gateway is in single-user local
/// mode and every request maps to the "local" owner. Once at least one
/// token exists, a valid bearer token is required.
async fn resolve_owner(state: &GatewayState, headers: &axum::http::HeaderMap) -> Option<String> {
    let sessions = state.sessions.read().await;
    if sessions.is_empty() {
        return Some("local".into());
    }

    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))?;

    sessions.get(token).cloned()
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key (bearer token or "anonymous").
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: std::time::Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<std::time::Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: std::time::Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        let now = std::time::Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict stale entries if the map grows too large
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Rate limiting middleware. The /health endpoint is exempt so monitoring
/// can poll it freely.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key.chars().take(20).collect::<String>(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct PairResponse {
    token: String,
    owner_id: String,
}

async fn pair_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<PairResponse>, StatusCode> {
    if let Some(expected) = state.pairing_code.as_deref() {
        let provided = headers.get("X-Pairing-Code").and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let token = uuid::Uuid::new_v4().to_string();
    let owner_id = format!("user_{}", uuid::Uuid::new_v4());

    let mut sessions = state.sessions.write().await;

    // Limit active tokens — evict an arbitrary entry when at capacity
    const MAX_TOKENS: usize = 100;
    if sessions.len() >= MAX_TOKENS {
        if let Some(oldest) = sessions.keys().next().cloned() {
            sessions.remove(&oldest);
        }
    }

    sessions.insert(token.clone(), owner_id.clone());

    Ok(Json(PairResponse { token, owner_id }))
}

/// The chat request body — mirrors the logical request of the pipeline.
#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub conversation_id: String,
    pub text: String,
    #[serde(default)]
    pub file_names: Vec<String>,
    #[serde(default)]
    pub document_data: String,
    #[serde(default)]
    pub search_requested: bool,
    #[serde(default)]
    pub deep_reasoning_requested: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatMetadata {
    pub used_history: bool,
    pub model_used: String,
}

impl ChatResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            turn: None,
            metadata: None,
            error: Some(message.into()),
        }
    }
}

async fn chat_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Json<ChatResponse> {
    // Authentication short-circuits before any capability call
    let Some(owner_id) = resolve_owner(&state, &headers).await else {
        return Json(ChatResponse::failure("User not authenticated"));
    };

    let request = ChatRequest {
        owner_id,
        conversation_id: ConversationId::from(&payload.conversation_id),
        text: payload.text,
        file_names: payload.file_names,
        document_data: payload.document_data,
        flags: ModeFlags {
            search_requested: payload.search_requested,
            deep_reasoning_requested: payload.deep_reasoning_requested,
        },
    };

    match state.pipeline.run(request).await {
        Ok(outcome) => Json(ChatResponse {
            success: true,
            turn: Some(outcome.assistant_turn),
            metadata: Some(ChatMetadata {
                used_history: outcome.used_history,
                model_used: outcome.model_used,
            }),
            error: None,
        }),
        Err(e) => {
            error!(error = %e, "Chat pipeline failed");
            Json(ChatResponse::failure(e.to_string()))
        }
    }
}

#[derive(Serialize)]
struct ConversationSummary {
    id: String,
    name: String,
    turn_count: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<Vec<ConversationSummary>>, StatusCode> {
    let Some(owner_id) = resolve_owner(&state, &headers).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.store.list(&owner_id).await {
        Ok(conversations) => Ok(Json(
            conversations
                .into_iter()
                .map(|c| ConversationSummary {
                    id: c.id.to_string(),
                    name: c.name,
                    turn_count: c.turns.len(),
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                })
                .collect(),
        )),
        Err(e) => {
            error!(error = %e, "Failed to list conversations");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
struct CreateConversationPayload {
    #[serde(default)]
    name: String,
}

async fn create_conversation_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(owner_id) = resolve_owner(&state, &headers).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.store.create(&owner_id, &payload.name).await {
        Ok(conversation) => Ok(Json(serde_json::json!({
            "id": conversation.id.to_string(),
            "name": conversation.name,
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create conversation");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
struct RenameConversationPayload {
    name: String,
}

async fn rename_conversation_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<RenameConversationPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(owner_id) = resolve_owner(&state, &headers).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state
        .store
        .rename(&owner_id, &ConversationId::from(&id), &payload.name)
        .await
    {
        Ok(true) => Ok(Json(serde_json::json!({ "success": true }))),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(error = %e, "Failed to rename conversation");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn delete_conversation_handler(
    State(state): State<SharedState>,
    headers: axum::http::HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(owner_id) = resolve_owner(&state, &headers).await else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state
        .store
        .delete(&owner_id, &ConversationId::from(&id))
        .await
    {
        Ok(true) => Ok(Json(serde_json::json!({ "success": true }))),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(error = %e, "Failed to delete conversation");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Generate a cryptographically strong 8-digit pairing code.
fn rand_code() -> u32 {
    use rand::Rng;
    let mut rng = rand::rng();
    rng.random_range(10_000_000..100_000_000)
}
