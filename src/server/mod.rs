//! HTTP server: routing, shared state, and the webhook integrations.
//!
//! ```text
//! Client ──── POST /run ───────────────► agent upstream, history + log
//!        ──── POST /setup ─────────────► agent upstream, log
//!        ──── POST /approve ───────────► agent upstream, log
//! Slack  ──── POST /slack ─────────────► ack now, reply to response_url
//! Meta   ──── GET  /webhook/messenger ─► challenge echo
//!        ──── POST /webhook/messenger ─► log + EVENT_RECEIVED
//! ```
//!
//! Handlers open one storage connection per request context, lazily, and
//! drop it on every exit path at scope end. Nothing is pooled.

pub mod chat;
pub mod messenger;
pub mod slack;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::{RwLock, oneshot};

use crate::agent::AgentClient;
use crate::config::Config;
use crate::error::Result;

/// Shared state for all handlers.
pub struct AppState {
    /// Relay client for the upstream agent.
    pub agent: AgentClient,
    /// Path of the conversation history database.
    pub history_db: PathBuf,
    /// Path of the audit log database.
    pub logs_db: PathBuf,
    /// Expected slash-command verification token, if configured.
    pub slack_verification_token: Option<String>,
    /// Expected messenger verify token, if configured.
    pub messenger_verify_token: Option<String>,
    /// Shutdown signal sender, filled in by [`start_server`].
    shutdown_tx: RwLock<Option<oneshot::Sender<()>>>,
}

impl AppState {
    /// Build the handler state from resolved configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            agent: AgentClient::new(config.agent_url.clone(), config.oauth.clone()),
            history_db: config.history_db.clone(),
            logs_db: config.logs_db.clone(),
            slack_verification_token: config.slack_verification_token.clone(),
            messenger_verify_token: config.messenger_verify_token.clone(),
            shutdown_tx: RwLock::new(None),
        }
    }

    /// Signal the serving task to stop accepting connections.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(chat::hello_world))
        .route("/setup", post(chat::handle_setup))
        .route("/run", post(chat::handle_run))
        .route("/approve", post(chat::handle_approve))
        .route("/slack", post(slack::handle_command))
        .route(
            "/webhook/messenger",
            get(messenger::verify).post(messenger::receive_event),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
/// The server runs on a spawned task until [`AppState::shutdown`] fires.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let app = router(Arc::clone(&state));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            tracing::info!("Server shutting down");
        })
        .await
        {
            tracing::error!("Server error: {e}");
        }
    });

    Ok(bound_addr)
}
