//! Slash-command webhook integration.
//!
//! The commanding platform expects an acknowledgement within a few seconds,
//! so the handler answers immediately with an ephemeral message and does the
//! agent round-trip on a spawned task, delivering the reply to the command's
//! `response_url` afterwards. Delivery is fire-and-forget.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Form, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::server::AppState;
use crate::server::chat::{outcome_columns, record_log, relay_message, reply_text};
use crate::storage::NewLogRecord;

/// Slash-command payload, form-encoded by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackCommand {
    /// Verification token the platform signs requests with.
    #[serde(default)]
    pub token: Option<String>,
    /// The command that was typed (`/ask`, ...).
    #[serde(default)]
    pub command: Option<String>,
    /// Text following the command; becomes the agent message.
    #[serde(default)]
    pub text: String,
    /// Where the delayed reply gets POSTed.
    pub response_url: String,
    /// The commanding user; doubles as the conversation session key.
    pub user_id: String,
}

/// Accept a slash command: verify, ack, and hand off to a spawned task.
///
/// A configured verification token that does not match rejects the request
/// before it reaches the agent boundary, so no audit row is written.
pub async fn handle_command(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Form(command): Form<SlackCommand>,
) -> Result<Json<serde_json::Value>, (StatusCode, &'static str)> {
    if let Some(expected) = &state.slack_verification_token {
        if command.token.as_deref() != Some(expected.as_str()) {
            return Err((StatusCode::FORBIDDEN, "verification failed"));
        }
    }

    let ip = addr.ip().to_string();
    let job_id = Uuid::new_v4();
    tracing::debug!(%job_id, user = %command.user_id, command = ?command.command, "Accepted slash command");

    let state = Arc::clone(&state);
    tokio::spawn(async move {
        relay_command(&state, &command, &ip, job_id).await;
    });

    Ok(Json(json!({
        "response_type": "ephemeral",
        "text": "Working on it...",
    })))
}

/// Run the agent round-trip for a command and deliver the reply.
async fn relay_command(state: &AppState, command: &SlackCommand, ip: &str, job_id: Uuid) {
    // The commanding user is the session: each user keeps one continuous
    // conversation across commands.
    let outcome = relay_message(state, &command.text, Some(&command.user_id)).await;

    let (response, error) = outcome_columns(&outcome);
    record_log(
        state,
        &NewLogRecord {
            kind: "slack",
            session_id: &command.user_id,
            ip,
            message: &command.text,
            response: &response,
            error: &error,
        },
    );

    let text = match &outcome {
        Ok(payload) => reply_text(payload),
        Err(e) => e.to_string(),
    };

    let callback = json!({"response_type": "in_channel", "text": text});
    let result = reqwest::Client::new()
        .post(&command.response_url)
        .json(&callback)
        .send()
        .await;
    match result {
        Ok(response) if !response.status().is_success() => {
            tracing::error!(%job_id, status = %response.status(), "Slash command callback rejected");
        }
        Ok(_) => tracing::debug!(%job_id, "Slash command reply delivered"),
        Err(e) => tracing::error!(%job_id, "Slash command callback failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parses_with_all_fields() {
        let command: SlackCommand = serde_json::from_value(json!({
            "token": "tok123",
            "command": "/ask",
            "text": "hello there",
            "response_url": "https://hooks.example.com/abc",
            "user_id": "U1",
        }))
        .unwrap();
        assert_eq!(command.token.as_deref(), Some("tok123"));
        assert_eq!(command.command.as_deref(), Some("/ask"));
        assert_eq!(command.text, "hello there");
        assert_eq!(command.user_id, "U1");
    }

    #[test]
    fn test_command_tolerates_missing_optional_fields() {
        let command: SlackCommand = serde_json::from_value(json!({
            "response_url": "https://hooks.example.com/abc",
            "user_id": "U1",
        }))
        .unwrap();
        assert!(command.token.is_none());
        assert!(command.command.is_none());
        assert!(command.text.is_empty());
    }
}
