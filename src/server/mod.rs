//! HTTP surface of the query service.
//!
//! A thin axum layer: `/search` runs the synchronous search path and
//! schedules the asynchronous summary task, `/ws/summary/{id}` streams
//! the summary, and `/health`, `/stats`, `/config` expose introspection.
//! Only this layer turns errors into HTTP statuses.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::query::SearchService;
use crate::summary::{SummarizerClient, SummaryCoordinator, WsFrame};

/// Interval between keep-alive pings on the summary channel.
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

/// Interval at which the socket loop re-checks for task completion.
const TERMINAL_POLL: std::time::Duration = std::time::Duration::from_millis(500);

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    /// The search path.
    pub search: Arc<SearchService>,
    /// Summarizer endpoint client.
    pub summarizer: Arc<SummarizerClient>,
    /// Summary task and connection owner.
    pub coordinator: Arc<SummaryCoordinator>,
    /// Service configuration.
    pub config: Arc<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<usize>,
}

/// Builds the service router.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/search", get(search_handler))
        .route("/ws/summary/:request_id", get(summary_socket_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/config", get(config_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Runs the server until the shutdown future resolves.
pub async fn run_server(
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "query service listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("query service stopped");
    Ok(())
}

/// `GET /search?q=Q&limit=L`: instant search plus a scheduled summary.
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(state.config.default_limit);
    let mut result = state.search.search(&params.q, limit).await;

    if result.error.is_some() {
        return (StatusCode::BAD_REQUEST, Json(result));
    }

    let request_id = state
        .coordinator
        .schedule(
            Arc::clone(&state.summarizer),
            params.q.clone(),
            result.results.clone(),
        )
        .await;
    result.ai_summary_request_id = Some(request_id);

    (StatusCode::OK, Json(result))
}

/// `GET /health`: liveness of the service and its collaborators.
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let index_store = state.search.healthy().await;
    let counts = state.coordinator.task_counts().await;

    Json(json!({
        "status": if index_store { "healthy" } else { "degraded" },
        "index_store": index_store,
        "ai_tasks_active": counts.active,
        "websocket_connections": state.coordinator.connection_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /stats`: search and summary counters.
async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    let counts = state.coordinator.task_counts().await;
    Json(json!({
        "search": {
            "cached_queries": state.search.cached_queries(),
        },
        "ai_summary_tasks": counts,
        "websockets": {
            "active_connections": state.coordinator.connection_count().await,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /config`: static service configuration.
async fn config_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "search_limit_default": state.config.default_limit,
        "search_limit_max": state.config.max_limit,
        "ai_summary_enabled": true,
        "websocket_enabled": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /ws/summary/{request_id}`: stream the summary to the client.
async fn summary_socket_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_summary_socket(state, socket, request_id))
}

/// Drives one summary connection: forwards generator frames, sends
/// keep-alive pings, and closes normally once the task is terminal.
async fn handle_summary_socket(state: AppState, mut socket: WebSocket, request_id: String) {
    let (tx, mut rx) = mpsc::channel::<WsFrame>(64);
    let initial = state.coordinator.register_connection(&request_id, tx).await;

    // Initial status frame for clients that attach late.
    if let Some(task) = initial
        && send_frame(&mut socket, &WsFrame::Status(task)).await.is_err()
    {
        state.coordinator.unregister_connection(&request_id).await;
        return;
    }

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await; // the first tick fires immediately
    let mut poll = tokio::time::interval(TERMINAL_POLL);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(frame) => {
                        if send_frame(&mut socket, &frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(value) = serde_json::from_str::<Value>(&text)
                            && value["type"] == "pong"
                        {
                            debug!(request_id, "pong received");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(request_id, "client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(request_id, %err, "socket error");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                if send_frame(&mut socket, &WsFrame::Ping).await.is_err() {
                    break;
                }
            }
            _ = poll.tick() => {
                // Exit as soon as the task is terminal, once queued frames
                // have been flushed.
                if rx.is_empty() && state.coordinator.is_terminal(&request_id).await {
                    break;
                }
            }
        }
    }

    state.coordinator.unregister_connection(&request_id).await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "summary complete".into(),
        })))
        .await;
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame) -> Result<(), axum::Error> {
    socket.send(Message::Text(frame.to_json().to_string())).await
}
