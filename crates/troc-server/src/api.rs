use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use troc_engine::{reconcile_sweep, Marketplace};
use troc_shared::constants::DEFAULT_MESSAGE_PAGE;
use troc_shared::protocol::{
    AcceptanceRequest, ConversationsQuery, IssueSessionRequest, ItemFlagsRequest, LikeOutcome,
    LikeRequest, NewItemRequest, ProposeTradeRequest, ProposeTradeResponse, ReconcileResponse,
    SendMessageRequest, SessionResponse, StatusResponse, UnlikeOutcome,
};
use troc_shared::{
    Conversation, ConversationId, Item, ItemId, Match, Message, Notification, NotificationId,
};
use troc_store::Database;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::sessions::{bearer_token, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub sessions: SessionRegistry,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            sessions: SessionRegistry::new(),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id/flags", post(set_item_flags))
        .route("/likes", post(like).delete(unlike))
        .route("/matches", get(list_matches))
        .route("/trades", post(propose_trade))
        .route("/trades/:id/acceptance", post(set_acceptance))
        .route("/trades/:id/reject", post(reject_trade))
        .route("/trades/:id/complete", post(complete_trade))
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id", get(get_conversation))
        .route(
            "/conversations/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_read))
        .route("/admin/sessions", post(admin_issue_session))
        .route("/admin/reconcile", post(admin_reconcile))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run `f` against the marketplace as seen by the caller of this request.
fn with_marketplace<T>(
    state: &AppState,
    headers: &HeaderMap,
    f: impl FnOnce(&Marketplace<'_>) -> troc_engine::Result<T>,
) -> Result<Json<T>, ServerError> {
    let session = state.sessions.resolve(headers);
    let db = state
        .db
        .lock()
        .map_err(|_| ServerError::Internal("database lock poisoned".into()))?;
    let market = Marketplace::new(&*db, &session);
    Ok(Json(f(&market)?))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    reconcile_interval_secs: u64,
}

#[derive(Deserialize)]
struct MessagesQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        reconcile_interval_secs: state.config.reconcile_interval_secs,
    })
}

// ─── Items ───

async fn create_item(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<NewItemRequest>,
) -> Result<Json<Item>, ServerError> {
    with_marketplace(&state, &headers, |m| m.create_item(req))
}

async fn list_items(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Item>>, ServerError> {
    with_marketplace(&state, &headers, |m| m.list_items())
}

async fn set_item_flags(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(req): Json<ItemFlagsRequest>,
) -> Result<Json<Item>, ServerError> {
    with_marketplace(&state, &headers, |m| {
        m.set_item_flags(id, req.is_available, req.is_visible)
    })
}

// ─── Likes and matches ───

async fn like(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeOutcome>, ServerError> {
    with_marketplace(&state, &headers, |m| m.like(req.item_id, req.context_item_id))
}

async fn unlike(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<UnlikeOutcome>, ServerError> {
    with_marketplace(&state, &headers, |m| m.unlike(req.item_id, req.context_item_id))
}

async fn list_matches(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Match>>, ServerError> {
    with_marketplace(&state, &headers, |m| m.list_matches())
}

// ─── Trades ───

async fn propose_trade(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<ProposeTradeRequest>,
) -> Result<Json<ProposeTradeResponse>, ServerError> {
    with_marketplace(&state, &headers, |m| {
        m.propose_trade(req.their_item_id, req.my_item_id)
    })
}

async fn set_acceptance(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<AcceptanceRequest>,
) -> Result<Json<StatusResponse>, ServerError> {
    with_marketplace(&state, &headers, |m| m.set_acceptance(id, req.accepted))
}

async fn reject_trade(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<StatusResponse>, ServerError> {
    with_marketplace(&state, &headers, |m| m.reject_trade(id))
}

async fn complete_trade(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<StatusResponse>, ServerError> {
    with_marketplace(&state, &headers, |m| m.complete_trade(id))
}

// ─── Conversations and messages ───

async fn list_conversations(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<Vec<Conversation>>, ServerError> {
    with_marketplace(&state, &headers, |m| match query.since {
        Some(since) => m.list_conversations_since(since),
        None => m.list_conversations(),
    })
}

async fn get_conversation(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Conversation>, ServerError> {
    with_marketplace(&state, &headers, |m| m.get_conversation(id))
}

async fn list_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Query(page): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let limit = page.limit.unwrap_or(DEFAULT_MESSAGE_PAGE);
    let offset = page.offset.unwrap_or(0);
    with_marketplace(&state, &headers, |m| m.list_messages(id, limit, offset))
}

async fn send_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    with_marketplace(&state, &headers, |m| {
        m.send_message(id, req.text, req.attachment_urls)
    })
}

// ─── Notifications ───

async fn list_notifications(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ServerError> {
    with_marketplace(&state, &headers, |m| m.list_notifications())
}

async fn mark_read(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    with_marketplace(&state, &headers, |m| m.mark_read(id))?;
    Ok(Json(serde_json::json!({ "read": true })))
}

// ─── Admin ───

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let token = bearer_token(headers).unwrap_or("");

    // Constant-time comparison to prevent timing attacks on admin token.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

/// Hand out a session token for a user the identity provider vouched for.
async fn admin_issue_session(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<IssueSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let token = state.sessions.issue(req.user_id);
    info!(user = %req.user_id, "Session issued");
    Ok(Json(SessionResponse {
        token,
        user_id: req.user_id,
    }))
}

async fn admin_reconcile(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let db = state
        .db
        .lock()
        .map_err(|_| ServerError::Internal("database lock poisoned".into()))?;
    let completed = reconcile_sweep(&*db)?;
    Ok(Json(ReconcileResponse { completed }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
