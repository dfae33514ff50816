//! Web server implementation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use skeleton_common::{Database, UserRepository};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory served for any path not matched by the API
    pub public_dir: PathBuf,
}

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    users: UserRepository,
    public_dir: PathBuf,
}

pub async fn serve(addr: SocketAddr, cfg: WebServerConfig) -> anyhow::Result<()> {
    let db = Database::open(&cfg.db_path)?;
    let server = WebServer::new(db, cfg.public_dir);
    server.serve(addr).await
}

impl WebServer {
    /// Create a new web server on top of an opened database
    pub fn new(db: Database, public_dir: PathBuf) -> Self {
        Self {
            state: Arc::new(WebServerState {
                users: UserRepository::new(db),
                public_dir,
            }),
        }
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/users", get(list_users_handler))
            .route("/api/users/:user_id", get(get_user_handler))
            .fallback_service(ServeDir::new(&self.state.public_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Web server starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "skeleton-web",
        "version": skeleton_common::VERSION
    }))
}

async fn list_users_handler(State(state): State<Arc<WebServerState>>) -> Response {
    match state.users.list() {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_user_handler(
    State(state): State<Arc<WebServerState>>,
    Path(user_id): Path<i64>,
) -> Response {
    match state.users.get(user_id) {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("user {} not found", user_id)})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: skeleton_common::Error) -> Response {
    error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": format!("{}", e)})),
    )
        .into_response()
}
