//! Messaging-platform webhook: subscription verification and event receipt.
//!
//! The platform verifies a subscription with a GET carrying `hub.*` query
//! parameters and expects the challenge echoed back; delivered events arrive
//! as POSTs and only need an `EVENT_RECEIVED` acknowledgement.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::server::AppState;
use crate::server::chat::{DEFAULT_SESSION, NONE_SENTINEL, record_log};
use crate::storage::NewLogRecord;

/// Subscription verification query, as the platform sends it.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Answer the subscription handshake.
///
/// Echoes the challenge with 200 only when the mode is `subscribe` and the
/// supplied verify token matches configuration; everything else, including
/// an unconfigured token, is 403. Verification never reaches the agent
/// boundary, so no audit row is written.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, StatusCode> {
    let Some(expected) = &state.messenger_verify_token else {
        return Err(StatusCode::FORBIDDEN);
    };

    let subscribing = params.mode.as_deref() == Some("subscribe");
    let token_matches = params.verify_token.as_deref() == Some(expected.as_str());

    match (subscribing && token_matches, params.challenge) {
        (true, Some(challenge)) => Ok(challenge),
        _ => Err(StatusCode::FORBIDDEN),
    }
}

/// Acknowledge a delivered event.
///
/// The event is logged and acked; no agent invocation happens here.
pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(event): Json<serde_json::Value>,
) -> &'static str {
    let ip = addr.ip().to_string();
    let message = event.to_string();

    record_log(
        &state,
        &NewLogRecord {
            kind: "webhook",
            session_id: DEFAULT_SESSION,
            ip: &ip,
            message: &message,
            response: "EVENT_RECEIVED",
            error: NONE_SENTINEL,
        },
    );

    "EVENT_RECEIVED"
}
