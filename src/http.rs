//! HTTP transports for the MCP handler.
//!
//! - **http**: `POST /mcp` carries one JSON-RPC message per request and
//!   returns the response inline.
//! - **sse**: the legacy MCP SSE transport. `GET /sse` opens a stream whose
//!   first event names the per-session `POST /messages?sessionId=...` URL;
//!   responses to posted messages arrive as `message` events on that stream.
//!
//! Both modes serve `GET /health`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::NinjaClient;
use crate::mcp;

type SessionMap = HashMap<String, mpsc::UnboundedSender<Value>>;

/// Shared state for the HTTP and SSE routers.
#[derive(Clone)]
pub struct AppState {
    client: Arc<NinjaClient>,
    sessions: Arc<Mutex<SessionMap>>,
    start_time: Instant,
}

impl AppState {
    pub fn new(client: Arc<NinjaClient>) -> Self {
        Self {
            client,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, SessionMap> {
        lock_sessions(&self.sessions)
    }
}

// Map operations never panic midway, so a poisoned map is still consistent.
fn lock_sessions(sessions: &Mutex<SessionMap>) -> MutexGuard<'_, SessionMap> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Router for the streamable-HTTP style transport.
pub fn http_router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp))
        .route("/health", get(health))
        .with_state(state)
}

/// Router for the SSE transport.
pub fn sse_router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_connect))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve `app` on `addr` until SIGINT/SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app.layer(TraceLayer::new_for_http()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT");
    }
}

/// `GET /health`: liveness probe.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.sessions().len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.start_time.elapsed().as_secs(),
        "configured": state.client.session().is_configured(),
        "sseSessions": sessions,
    }))
}

/// `POST /mcp`: one JSON-RPC message in, its response out.
///
/// Notifications produce `202 Accepted` with an empty body.
async fn post_mcp(State(state): State<AppState>, body: String) -> Response {
    match mcp::handle_line(&body, &state.client).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `GET /sse`: open a session stream.
async fn sse_connect(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    state.sessions().insert(session_id.clone(), tx);
    info!(%session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));

    let messages = stream::unfold(rx, |mut rx| async move {
        let value = rx.recv().await?;
        let data = serde_json::to_string(&value).unwrap_or_default();
        Some((Ok::<_, Infallible>(Event::default().event("message").data(data)), rx))
    });

    let stream = SessionStream {
        inner: stream::once(async move { Ok::<_, Infallible>(endpoint) })
            .chain(messages)
            .boxed(),
        sessions: state.sessions.clone(),
        session_id,
    };

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
}

#[derive(Deserialize)]
struct MessageParams {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// `POST /messages?sessionId=...`: handle a message for an SSE session.
///
/// The JSON-RPC response (if any) is pushed onto the session's stream.
async fn post_message(
    State(state): State<AppState>,
    Query(params): Query<MessageParams>,
    body: String,
) -> Response {
    let Some(tx) = state.sessions().get(&params.session_id).cloned() else {
        return (StatusCode::NOT_FOUND, "Unknown session").into_response();
    };

    let client = state.client.clone();
    tokio::spawn(async move {
        if let Some(response) = mcp::handle_line(&body, &client).await {
            if tx.send(response).is_err() {
                debug!(session_id = %params.session_id, "SSE session closed before response");
            }
        }
    });
    StatusCode::ACCEPTED.into_response()
}

/// Event stream that unregisters its session when dropped.
struct SessionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    sessions: Arc<Mutex<SessionMap>>,
    session_id: String,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        lock_sessions(&self.sessions).remove(&self.session_id);
        info!(session_id = %self.session_id, "SSE session closed");
    }
}
