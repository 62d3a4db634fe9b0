//! Credential store: named API keys read from the database at runtime.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;

/// Logical credential names read by the scoring pipeline.
pub const CREDENTIAL_NAMES: [&str; 4] = [
    "google_generative_ai_key",
    "anthropic_api_key",
    "openai_api_key",
    "grok_api_key",
];

/// API keys mapped to provider roles, resolved in a single query.
#[derive(Debug, Default, Clone)]
pub struct ProviderKeys {
    pub google: Option<String>,
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub grok: Option<String>,
}

/// Credentials store with a borrowed connection.
pub struct Credentials<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Credentials<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Look up a single credential by logical name.
    pub fn get(&self, name: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT value FROM credentials WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
    }

    /// Store or replace a credential.
    pub fn set(&self, name: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            r#"
            INSERT INTO credentials (name, value)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
            params![name, value],
        )?;
        Ok(())
    }

    /// Remove a credential. Returns true if a row was deleted.
    pub fn delete(&self, name: &str) -> Result<bool, rusqlite::Error> {
        let rows = self
            .conn
            .execute("DELETE FROM credentials WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }

    /// List stored credential names (values are not returned).
    pub fn names(&self) -> Result<Vec<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM credentials ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Read all provider keys in one query and map them to logical roles.
    pub fn provider_keys(&self) -> Result<ProviderKeys, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT name, value FROM credentials")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut keys = ProviderKeys::default();
        for row in rows {
            let (name, value) = row?;
            match name.as_str() {
                "google_generative_ai_key" => keys.google = Some(value),
                "anthropic_api_key" => keys.anthropic = Some(value),
                "openai_api_key" => keys.openai = Some(value),
                "grok_api_key" => keys.grok = Some(value),
                _ => {}
            }
        }
        Ok(keys)
    }
}
