//! Configuration management.
//!
//! Values come from CLI flags with environment fallbacks (wired up by clap
//! in the binary); this module owns the defaulting and validation that clap
//! cannot express.
//!
//! # Architecture
//!
//! agentgate uses two separate database files, each bootstrapped by its own
//! store:
//! - **History**: `~/.agentgate/data/history.db` (`chat_history` table)
//! - **Logs**: `~/.agentgate/data/logs.db` (`logs` table)

use crate::error::{Error, Result};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Resolved runtime configuration for the server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// Base URL of the upstream agent service.
    pub agent_url: String,
    /// Path to the conversation history database.
    pub history_db: PathBuf,
    /// Path to the audit log database.
    pub logs_db: PathBuf,
    /// Verification token for the chat-command webhook, if any.
    pub slack_verification_token: Option<String>,
    /// Verify token for the messenger subscription handshake, if any.
    pub messenger_verify_token: Option<String>,
    /// OAuth2 client-credentials settings for the upstream, if any.
    pub oauth: Option<OauthConfig>,
}

/// OAuth2 client-credentials settings for authenticating upstream calls.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl OauthConfig {
    /// Assemble OAuth2 settings from three optional values.
    ///
    /// All three must be present together; a partial set is a configuration
    /// error rather than a silently unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if only some of the three values are set.
    pub fn from_parts(
        token_url: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Option<Self>> {
        match (token_url, client_id, client_secret) {
            (Some(token_url), Some(client_id), Some(client_secret)) => Ok(Some(Self {
                token_url,
                client_id,
                client_secret,
            })),
            (None, None, None) => Ok(None),
            _ => Err(Error::Config(
                "OAuth2 requires token url, client id, and client secret together".to_string(),
            )),
        }
    }
}

impl Config {
    /// Create the parent directories of both database files.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_data_dirs(&self) -> Result<()> {
        for path in [&self.history_db, &self.logs_db] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Get the global agentgate data directory location (`~/.agentgate`).
#[must_use]
pub fn global_data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".agentgate"))
}

/// Resolve the conversation history database path.
///
/// Priority:
/// 1. Explicit path (CLI flag or its environment fallback)
/// 2. Global location: `~/.agentgate/data/history.db`
#[must_use]
pub fn resolve_history_db_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    global_data_dir().map(|dir| dir.join("data").join("history.db"))
}

/// Resolve the audit log database path.
///
/// Same priority as [`resolve_history_db_path`], defaulting to
/// `~/.agentgate/data/logs.db`. The two stores live in separate files,
/// and each bootstraps its own schema.
#[must_use]
pub fn resolve_logs_db_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    global_data_dir().map(|dir| dir.join("data").join("logs.db"))
}
