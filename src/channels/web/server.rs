//! Axum HTTP server for the dashboard.
//!
//! Handles all API routes: sessions, chat, secret browsing, stats, health,
//! and static file serving.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, oneshot};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use uuid::Uuid;

use crate::agent::Agent;
use crate::channels::web::auth::{AuthState, auth_middleware};
use crate::channels::web::types::*;
use crate::config::{AgentConfig, SessionLimits};
use crate::error::{ChannelError, VaultError};
use crate::llm::LlmProvider;
use crate::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};
use crate::vault::{self, ItemType, VaultClient};

/// One browser session: its own agent plus the transcript shown in the UI.
pub struct DashboardSession {
    agent: Agent,
    history: Vec<ChatEntry>,
}

type SharedSession = Arc<Mutex<DashboardSession>>;

struct SessionSlot {
    session: SharedSession,
    last_used: Instant,
}

/// How often idle sessions are swept while the server runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state for all dashboard handlers.
pub struct DashboardState {
    pub provider: Arc<dyn LlmProvider>,
    pub vault: VaultClient,
    pub agent_config: AgentConfig,
    pub observer: Arc<dyn Observer>,
    pub limits: SessionLimits,
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    /// Shutdown signal sender.
    pub shutdown_tx: RwLock<Option<oneshot::Sender<()>>>,
}

impl DashboardState {
    pub fn new(provider: Arc<dyn LlmProvider>, vault: VaultClient) -> Self {
        Self {
            provider,
            vault,
            agent_config: AgentConfig::default(),
            observer: Arc::new(NoopObserver),
            limits: SessionLimits::default(),
            sessions: RwLock::new(HashMap::new()),
            shutdown_tx: RwLock::new(None),
        }
    }

    pub fn with_agent_config(mut self, config: AgentConfig) -> Self {
        self.agent_config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Open a new session with a fresh agent.
    ///
    /// Idle sessions are swept first. Returns `None` when the session cap
    /// is still reached after that.
    pub async fn open_session(&self) -> Option<Uuid> {
        self.evict_idle().await;

        let agent = Agent::new(Arc::clone(&self.provider), self.vault.clone())
            .with_config(self.agent_config.clone())
            .with_observer(Arc::clone(&self.observer));
        let id = Uuid::new_v4();

        let active = {
            let mut sessions = self.sessions.write().await;
            if sessions.len() >= self.limits.max_sessions {
                tracing::warn!(
                    max = self.limits.max_sessions,
                    "Refusing dashboard session, limit reached"
                );
                return None;
            }
            sessions.insert(
                id,
                SessionSlot {
                    session: Arc::new(Mutex::new(DashboardSession {
                        agent,
                        history: Vec::new(),
                    })),
                    last_used: Instant::now(),
                },
            );
            sessions.len()
        };

        self.record_session_change(id, true, active);
        Some(id)
    }

    /// Drop a session. Returns false if it did not exist.
    pub async fn close_session(&self, id: Uuid) -> bool {
        let (removed, active) = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(&id).is_some();
            (removed, sessions.len())
        };

        if removed {
            self.record_session_change(id, false, active);
        }
        removed
    }

    /// Drop sessions idle for at least the configured TTL. Sessions with a
    /// request in flight are kept. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let (evicted, active) = {
            let mut sessions = self.sessions.write().await;
            let evicted: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, slot)| {
                    slot.last_used.elapsed() >= self.limits.idle_ttl
                        && Arc::strong_count(&slot.session) == 1
                })
                .map(|(id, _)| *id)
                .collect();
            for id in &evicted {
                sessions.remove(id);
            }
            (evicted, sessions.len())
        };

        for id in &evicted {
            tracing::info!(session_id = %id, "Evicting idle dashboard session");
            self.record_session_change(*id, false, active);
        }
        evicted.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn session(&self, id: Uuid) -> Result<SharedSession, (StatusCode, String)> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get_mut(&id)
            .ok_or((StatusCode::NOT_FOUND, format!("Session {id} not found")))?;
        slot.last_used = Instant::now();
        Ok(Arc::clone(&slot.session))
    }

    fn record_session_change(&self, id: Uuid, opened: bool, active: usize) {
        tracing::info!(session_id = %id, opened, active, "Dashboard session changed");
        self.observer.record_event(&ObserverEvent::SessionChange {
            session_id: id.to_string(),
            opened,
        });
        self.observer
            .record_metric(&ObserverMetric::ActiveSessions(active as u64));
    }
}

/// Start the dashboard HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<DashboardState>,
    auth_token: String,
) -> Result<SocketAddr, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "dashboard".to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "dashboard".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    // Public routes (no auth)
    let public = Router::new().route("/api/health", get(health_handler));

    // Protected routes (require auth)
    let auth_state = AuthState { token: auth_token };
    let protected = Router::new()
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{id}", delete(delete_session_handler))
        .route("/api/sessions/{id}/chat", post(chat_handler))
        .route(
            "/api/sessions/{id}/history",
            get(history_handler).delete(clear_history_handler),
        )
        .route("/api/secrets", get(list_secrets_handler))
        .route("/api/secrets/value", get(secret_value_handler))
        .route("/api/stats", get(stats_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // Static file routes (no auth, served from embedded strings)
    let statics = Router::new()
        .route("/", get(index_handler))
        .route("/style.css", get(css_handler))
        .route("/app.js", get(js_handler));

    // CORS: only the dashboard's own localhost origins.
    let origins: Vec<HeaderValue> = [
        format!("http://{}:{}", bound_addr.ip(), bound_addr.port()),
        format!("http://localhost:{}", bound_addr.port()),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ]))
        .allow_credentials(true);

    let app = Router::new()
        .merge(public)
        .merge(statics)
        .merge(protected)
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    // The sweeper stops once the last handle to the state is dropped.
    let sweep_state = Arc::downgrade(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(state) = sweep_state.upgrade() else {
                break;
            };
            state.evict_idle().await;
        }
    });

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Dashboard shutting down");
            })
            .await
        {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    Ok(bound_addr)
}

// --- Static file handlers ---

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("static/index.html"))
}

async fn css_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_str!("static/style.css"),
    )
}

async fn js_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("static/app.js"),
    )
}

// --- Health ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        channel: "dashboard",
    })
}

// --- Session handlers ---

async fn create_session_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<(StatusCode, Json<SessionCreatedResponse>), (StatusCode, String)> {
    let session_id = state.open_session().await.ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Too many open sessions. Try again later.".to_string(),
    ))?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse { session_id }),
    ))
}

async fn delete_session_handler(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.close_session(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Session {id} not found")))
    }
}

// --- Chat handlers ---

async fn chat_handler(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is empty".to_string()));
    }

    let session = state.session(id).await?;
    // Held for the whole utterance so a session answers one message at a time.
    let mut session = session.lock().await;

    session.history.push(ChatEntry::new(ChatRole::User, content));
    let response = session.agent.chat(content).await;
    session
        .history
        .push(ChatEntry::new(ChatRole::Agent, response.clone()));

    Ok(Json(ChatResponse { response }))
}

async fn history_handler(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let session = state.session(id).await?;
    let messages = session.lock().await.history.clone();
    Ok(Json(HistoryResponse { messages }))
}

async fn clear_history_handler(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    session.history.clear();
    session.agent.reset();
    Ok(StatusCode::NO_CONTENT)
}

// --- Secret browser handlers ---

type VaultResponse = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Successful gateway results pass through; failures become 502 with the
/// same `{"error", "detail"}` body the agent's tools produce.
fn vault_response<T: Serialize>(result: Result<T, VaultError>) -> VaultResponse {
    match result {
        Ok(value) => Ok(Json(vault::tagged(Ok::<T, VaultError>(value)))),
        Err(e) => {
            tracing::warn!(error = %e, "Vault request from dashboard failed");
            Err((StatusCode::BAD_GATEWAY, Json(vault::error_value(&e))))
        }
    }
}

async fn list_secrets_handler(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<ListSecretsQuery>,
) -> VaultResponse {
    let filter = query.type_filter().map(str::to_lowercase);
    vault_response(state.vault.list_items(&query.path, filter.as_deref()).await)
}

async fn secret_value_handler(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<SecretValueQuery>,
) -> VaultResponse {
    match ItemType::classify(&query.item_type) {
        ItemType::Static => vault_response(state.vault.get_static_secret(&query.name).await),
        ItemType::Rotated => vault_response(state.vault.get_rotated_secret(&query.name).await),
        ItemType::Dynamic | ItemType::Other => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Type not supported" })),
        )),
    }
}

async fn stats_handler(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<StatsQuery>,
) -> VaultResponse {
    vault_response(state.vault.count_by_type(&query.path).await)
}
