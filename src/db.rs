//! Transcript persistence
//!
//! Append-only audit log of user and assistant turns, one row per message.

mod schema;

pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Transcript storage unavailable")]
    Unavailable,
}

pub type DbResult<T> = Result<T, TranscriptError>;

/// Destination for transcript rows.
///
/// Callers treat failures as non-fatal: they are logged, never propagated
/// into the conversation.
pub trait TranscriptSink: Send + Sync {
    fn record(&self, session_id: &str, role: TranscriptRole, content: &str) -> DbResult<()>;
}

/// Sink used when no transcript database could be opened
pub struct DiscardTranscript;

impl TranscriptSink for DiscardTranscript {
    fn record(&self, _session_id: &str, _role: TranscriptRole, _content: &str) -> DbResult<()> {
        Ok(())
    }
}

/// Thread-safe SQLite transcript handle
#[derive(Clone)]
pub struct TranscriptStore {
    conn: Arc<Mutex<Connection>>,
}

impl TranscriptStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| TranscriptError::Unavailable)
    }

    /// Append one row. Empty content is skipped and returns `None`.
    pub fn append(&self, session_id: &str, role: TranscriptRole, content: &str) -> DbResult<Option<String>> {
        if content.is_empty() {
            return Ok(None);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.conn()?.execute(
            "INSERT INTO interactions (id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, session_id, role.as_str(), content, now.to_rfc3339()],
        )?;
        Ok(Some(id))
    }
}

impl TranscriptSink for TranscriptStore {
    fn record(&self, session_id: &str, role: TranscriptRole, content: &str) -> DbResult<()> {
        self.append(session_id, role, content).map(|_| ())
    }
}
