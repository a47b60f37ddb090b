//! Session-scoped conversation history store.
//!
//! Owns the `chat_history` table: one row per message, grouped by an opaque
//! caller-supplied session id, appended in conversation order and never
//! mutated or deleted. The role column is an open string at write time;
//! reads reconstruct only rows whose role parses to a known [`Role`] and
//! silently drop the rest, which keeps old databases readable across
//! role-set changes.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

/// Schema for the history table. The timestamp is assigned by the store at
/// insert time and is non-decreasing in insertion order.
const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS chat_history (
        session_id TEXT,
        type TEXT,
        msg TEXT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
    )
";

/// Role of a reconstructed chat message.
///
/// Serialized as `human`/`ai` when history is shipped to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }

    /// Parse a stored role value.
    ///
    /// Returns `None` for anything outside the known set; the caller drops
    /// such rows rather than erroring.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Self::Human),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// A role-tagged message reconstructed from the store.
///
/// The serialized shape (`type` + `content`) is the history element format
/// the upstream agent contract expects.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
}

/// Create the history table if absent.
///
/// Idempotent; safe to call on every connection acquisition.
///
/// # Errors
///
/// Returns an error if the DDL fails.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Fetch all messages for a session in insertion order.
///
/// A missing session id is not an error: the read short-circuits to an
/// empty sequence without touching storage. Rows with unrecognized roles
/// are filtered out.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fetch_history(conn: &Connection, session_id: Option<&str>) -> Result<Vec<ChatMessage>> {
    let Some(session_id) = session_id else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        "SELECT type, msg FROM chat_history WHERE session_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map([session_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (role, content) = row?;
        if let Some(role) = Role::parse(&role) {
            history.push(ChatMessage { role, content });
        }
    }
    Ok(history)
}

/// Append one message to a session.
///
/// The role is stored as given, without validation; an unknown role
/// value never surfaces on reads.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn append_message(
    conn: &Connection,
    session_id: &str,
    content: &str,
    role: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_history (session_id, type, msg) VALUES (?1, ?2, ?3)",
        rusqlite::params![session_id, role, content],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_session_reads_empty_without_schema() {
        // No ensure_schema here: if the read touched storage it would
        // fail on the missing table.
        let conn = Connection::open_in_memory().unwrap();
        let history = fetch_history(&conn, None).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        append_message(&conn, "s1", "still works", "human").unwrap();
        assert_eq!(fetch_history(&conn, Some("s1")).unwrap().len(), 1);
    }

    #[test]
    fn test_round_trip_single_message() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        append_message(&conn, "s1", "hello", "human").unwrap();

        let history = fetch_history(&conn, Some("s1")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Human);
        assert_eq!(history[0].content, "hello");
    }

    #[test]
    fn test_order_preserved_and_unknown_roles_dropped() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        append_message(&conn, "s1", "first", "human").unwrap();
        // Accepted at write time, invisible on read.
        append_message(&conn, "s1", "hidden", "system").unwrap();
        append_message(&conn, "s1", "second", "ai").unwrap();

        let history = fetch_history(&conn, Some("s1")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Human);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].role, Role::Ai);
        assert_eq!(history[1].content, "second");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        append_message(&conn, "s1", "hello", "human").unwrap();
        append_message(&conn, "s1", "hi there", "ai").unwrap();
        append_message(&conn, "s2", "other", "human").unwrap();

        let s1 = fetch_history(&conn, Some("s1")).unwrap();
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].content, "hello");
        assert_eq!(s1[1].content, "hi there");

        let s2 = fetch_history(&conn, Some("s2")).unwrap();
        assert_eq!(s2.len(), 1);
        assert_eq!(s2[0].role, Role::Human);
        assert_eq!(s2[0].content, "other");

        assert!(fetch_history(&conn, Some("s3")).unwrap().is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage {
            role: Role::Ai,
            content: "reply".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ai");
        assert_eq!(json["content"], "reply");
    }
}
