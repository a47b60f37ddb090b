//! Chat relay endpoints: `/`, `/setup`, `/run`, `/approve`.
//!
//! These handlers are the request layer around the two stores: they read
//! history before the agent call, write history and the audit row after it,
//! and convert agent failures into the raw error text the end user sees.
//! The audit row is appended after the primary outcome is computed, so a
//! failed append can never replace or mask that outcome.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, State},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::server::AppState;
use crate::storage::{self, NewLogRecord, Role, history};

/// Sentinel the audit log stores for absent response/error values.
pub(crate) const NONE_SENTINEL: &str = "None";

/// Session key the audit log uses when a request carries none.
pub(crate) const DEFAULT_SESSION: &str = "default";

/// Liveness probe.
pub async fn hello_world() -> &'static str {
    "Hello, World!"
}

/// Request body for the `/run` endpoint.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// The user's message.
    pub msg: String,
    /// Opaque session key grouping this conversation, if the caller has one.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for the `/setup` endpoint.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    /// The user's input from the setup form.
    pub config: serde_json::Value,
}

/// Handle one user message.
///
/// The agent payload is a dictionary with `success`, `message` (the
/// user-visible reply), and optional `data`/`context` keys; it is returned
/// to the caller verbatim. On failure the response body is the raw error
/// text, and the audit row records the failure.
pub async fn handle_run(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RunRequest>,
) -> Json<serde_json::Value> {
    let ip = addr.ip().to_string();
    let outcome = relay_message(&state, &req.msg, req.session_id.as_deref()).await;

    let (response, error) = outcome_columns(&outcome);
    record_log(
        &state,
        &NewLogRecord {
            kind: "run",
            session_id: req.session_id.as_deref().unwrap_or(DEFAULT_SESSION),
            ip: &ip,
            message: &req.msg,
            response: &response,
            error: &error,
        },
    );

    match outcome {
        Ok(payload) => Json(payload),
        Err(e) => Json(serde_json::Value::String(e.to_string())),
    }
}

/// Handle the setup form submitted when an instance is first created.
///
/// Responds `{"success": true, "message": "Setup successful."}` when the
/// agent accepts the config, otherwise `success: false` with the error text
/// as the message.
pub async fn handle_setup(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<SetupRequest>,
) -> Json<serde_json::Value> {
    let ip = addr.ip().to_string();
    let message = req.config.to_string();
    let outcome = state.agent.setup(&req.config).await;

    let (response, error) = outcome_columns(&outcome);
    record_log(
        &state,
        &NewLogRecord {
            kind: "setup",
            session_id: DEFAULT_SESSION,
            ip: &ip,
            message: &message,
            response: &response,
            error: &error,
        },
    );

    match outcome {
        Ok(_) => Json(json!({"success": true, "message": "Setup successful."})),
        Err(e) => Json(json!({"success": false, "message": e.to_string()})),
    }
}

/// Relay an approval payload to the agent verbatim.
///
/// Same request/response discipline as `/run`, without history writes:
/// approvals are not message-bearing.
pub async fn handle_approve(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let ip = addr.ip().to_string();
    let session_id = payload
        .get("session_id")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string);
    let message = payload.to_string();

    let outcome = state.agent.approve(&payload).await;

    let (response, error) = outcome_columns(&outcome);
    record_log(
        &state,
        &NewLogRecord {
            kind: "approve",
            session_id: session_id.as_deref().unwrap_or(DEFAULT_SESSION),
            ip: &ip,
            message: &message,
            response: &response,
            error: &error,
        },
    );

    match outcome {
        Ok(payload) => Json(payload),
        Err(e) => Json(serde_json::Value::String(e.to_string())),
    }
}

/// The primary message pipeline: fetch history, relay, append history.
///
/// Without a session id the history database is never opened: the read
/// short-circuits to empty and nothing is written back. With one, a single
/// connection serves both the read and the appended human/ai pair, and is
/// dropped when this function returns on any path.
pub(crate) async fn relay_message(
    state: &AppState,
    msg: &str,
    session_id: Option<&str>,
) -> Result<serde_json::Value> {
    let conn = match session_id {
        Some(_) => Some(storage::open_history_db(&state.history_db)?),
        None => None,
    };

    let history = match &conn {
        Some(conn) => history::fetch_history(conn, session_id)?,
        None => Vec::new(),
    };

    let payload = state.agent.run(msg, session_id, &history).await?;

    if let (Some(conn), Some(session_id)) = (&conn, session_id) {
        let reply = reply_text(&payload);
        history::append_message(conn, session_id, msg, Role::Human.as_str())?;
        history::append_message(conn, session_id, &reply, Role::Ai.as_str())?;
    }

    Ok(payload)
}

/// Extract the user-visible reply from an agent payload.
///
/// The platform convention is that the payload's `message` key carries the
/// reply; payloads without one are stored serialized.
pub(crate) fn reply_text(payload: &serde_json::Value) -> String {
    payload
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| payload.to_string(), ToString::to_string)
}

/// Render an agent outcome as the audit response/error columns.
pub(crate) fn outcome_columns(outcome: &Result<serde_json::Value>) -> (String, String) {
    match outcome {
        Ok(payload) => (payload.to_string(), NONE_SENTINEL.to_string()),
        Err(e) => (NONE_SENTINEL.to_string(), e.to_string()),
    }
}

/// Append one audit row, swallowing storage failures.
///
/// By the time this runs the primary response has been computed; a failed
/// append is traced and the response still goes out.
pub(crate) fn record_log(state: &AppState, record: &NewLogRecord<'_>) {
    let result = storage::open_logs_db(&state.logs_db)
        .and_then(|conn| storage::logs::append_log(&conn, record));
    if let Err(e) = result {
        tracing::error!(kind = record.kind, "Failed to append audit log: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_reply_text_prefers_message_key() {
        let payload = json!({"success": true, "message": "hi there", "data": {}});
        assert_eq!(reply_text(&payload), "hi there");
    }

    #[test]
    fn test_reply_text_falls_back_to_serialized_payload() {
        let payload = json!({"success": true});
        assert_eq!(reply_text(&payload), r#"{"success":true}"#);

        // A non-string message key is not the reply.
        let payload = json!({"message": 42});
        assert_eq!(reply_text(&payload), r#"{"message":42}"#);
    }

    #[test]
    fn test_outcome_columns_success() {
        let outcome = Ok(json!({"message": "ok"}));
        let (response, error) = outcome_columns(&outcome);
        assert_eq!(response, r#"{"message":"ok"}"#);
        assert_eq!(error, "None");
    }

    #[test]
    fn test_outcome_columns_failure() {
        let outcome = Err(Error::Agent("agent exploded".to_string()));
        let (response, error) = outcome_columns(&outcome);
        assert_eq!(response, "None");
        assert_eq!(error, "Agent error: agent exploded");
    }
}
