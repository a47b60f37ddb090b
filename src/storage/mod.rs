//! SQLite storage layer for agentgate.
//!
//! Two independent append-only stores, each owning one table in its own
//! database file:
//!
//! - [`history`] - Session-scoped conversation history (`chat_history`)
//! - [`logs`] - Append-only audit log of handled requests (`logs`)
//!
//! Store operations take an explicit `&Connection`; the request layer opens
//! one connection per request context and drops it at scope end. Nothing is
//! pooled or shared across requests. Storage errors propagate uncaught.

pub mod history;
pub mod logs;

pub use history::{ChatMessage, Role};
pub use logs::{LogRecord, NewLogRecord};

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::Result;

/// Open the conversation history database at the given path.
///
/// Applies the history schema on every open, so it is safe to call once per
/// request without any prior bootstrap step.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or the schema
/// fails to apply.
pub fn open_history_db(path: &Path) -> Result<Connection> {
    let conn = open(path)?;
    history::ensure_schema(&conn)?;
    Ok(conn)
}

/// Open the audit log database at the given path.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or the schema
/// fails to apply.
pub fn open_logs_db(path: &Path) -> Result<Connection> {
    let conn = open(path)?;
    logs::ensure_schema(&conn)?;
    Ok(conn)
}

fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    // Concurrent writers wait on the engine lock instead of failing fast.
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}
