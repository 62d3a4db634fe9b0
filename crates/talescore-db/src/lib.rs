//! Database layer for talescore.
//!
//! Provides a unified `Database` struct that owns the SQLite connection
//! and provides access to domain-specific stores: credentials, tales,
//! and per-model score records.

mod credentials;
mod scores;
mod tales;

pub use credentials::{Credentials, ProviderKeys, CREDENTIAL_NAMES};
pub use scores::{ScoreRow, Scores};
pub use tales::{TaleFilter, TaleRecord, Tales};

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/talescore/talescore.db`.
    pub fn open() -> Result<Self, rusqlite::Error> {
        let db_path = Self::default_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        Self::open_at(&db_path)
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talescore")
            .join("talescore.db")
    }

    /// Access the credentials store.
    pub fn credentials(&self) -> Credentials<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Credentials::new(conn)
    }

    /// Access the tales store.
    pub fn tales(&self) -> Tales<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Tales::new(conn)
    }

    /// Access the per-model scores store.
    pub fn scores(&self) -> Scores<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Scores::new(conn)
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tales (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                excerpt TEXT,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'published',
                stepten_score REAL,
                score_breakdown TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tale_scores (
                tale_id TEXT NOT NULL,
                model TEXT NOT NULL,
                provider TEXT NOT NULL,
                weighted_score REAL NOT NULL,
                rating TEXT NOT NULL,
                breakdown TEXT NOT NULL,
                top_strengths TEXT,
                top_weaknesses TEXT,
                improvements TEXT,
                raw_response TEXT NOT NULL,
                scored_at TEXT NOT NULL,
                PRIMARY KEY (tale_id, model)
            );

            CREATE INDEX IF NOT EXISTS idx_tales_status ON tales(status);
            CREATE INDEX IF NOT EXISTS idx_tale_scores_tale ON tale_scores(tale_id);
            "#,
        )
    }
}
