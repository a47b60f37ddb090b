//! Append-only audit log store.
//!
//! Owns the `logs` table: one row per handled request that reached the
//! agent boundary, success or failure. The store assigns only the
//! timestamp; every other field is caller-supplied text, including the
//! `"None"` sentinels the request layer uses for absent error/response
//! values. Rows are never updated or deleted.

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS logs (
        type TEXT,
        session_id TEXT,
        ip_address TEXT,
        message TEXT,
        response TEXT,
        error TEXT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
    )
";

/// Log record to be appended, borrowing the caller's field values.
///
/// All six fields are required; the store does no defaulting beyond the
/// timestamp and no validation of field shapes.
#[derive(Debug, Clone)]
pub struct NewLogRecord<'a> {
    /// Name of the triggering endpoint (`run`, `setup`, ...).
    pub kind: &'a str,
    /// Session the request belonged to, or the literal `"default"`.
    pub session_id: &'a str,
    /// Remote address the request came from.
    pub ip: &'a str,
    /// Raw input payload, serialized to text when structured.
    pub message: &'a str,
    /// Raw output payload as text, or the literal `"None"` on failure.
    pub response: &'a str,
    /// Error text, or the literal `"None"` when absent.
    pub error: &'a str,
}

/// A log row as fetched back out of the store.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub kind: String,
    pub session_id: String,
    pub ip: String,
    pub message: String,
    pub response: String,
    pub error: String,
    /// Store-assigned creation time, as SQLite rendered it.
    pub timestamp: String,
}

/// Create the log table if absent.
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

/// Append one log record.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn append_log(conn: &Connection, record: &NewLogRecord<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO logs (type, session_id, ip_address, message, response, error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            record.kind,
            record.session_id,
            record.ip,
            record.message,
            record.response,
            record.error,
        ],
    )?;
    Ok(())
}

/// Fetch every log row.
///
/// No filtering, no pagination. The store guarantees no ordering; readers
/// must not assume one.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fetch_all_logs(conn: &Connection) -> Result<Vec<LogRecord>> {
    let mut stmt = conn.prepare(
        "SELECT type, session_id, ip_address, message, response, error, timestamp FROM logs",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LogRecord {
            kind: row.get(0)?,
            session_id: row.get(1)?,
            ip: row.get(2)?,
            message: row.get(3)?,
            response: row.get(4)?,
            error: row.get(5)?,
            timestamp: row.get(6)?,
        })
    })?;

    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}
