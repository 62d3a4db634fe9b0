//! Per-(tale, model) score records.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

/// One model's scoring result for one tale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub tale_id: String,
    pub model: String,
    pub provider: String,
    pub weighted_score: f64,
    pub rating: String,
    /// JSON blob: criterion name -> {score, feedback}
    pub breakdown: String,
    pub top_strengths: Option<String>,
    pub top_weaknesses: Option<String>,
    pub improvements: Option<String>,
    pub raw_response: String,
    pub scored_at: DateTime<Utc>,
}

/// Scores store with a borrowed connection.
pub struct Scores<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Scores<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert or replace the score for a (tale, model) pair.
    pub fn upsert(&self, row: &ScoreRow) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            r#"
            INSERT INTO tale_scores (tale_id, model, provider, weighted_score, rating, breakdown,
                                     top_strengths, top_weaknesses, improvements, raw_response, scored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(tale_id, model) DO UPDATE SET
                provider = excluded.provider,
                weighted_score = excluded.weighted_score,
                rating = excluded.rating,
                breakdown = excluded.breakdown,
                top_strengths = excluded.top_strengths,
                top_weaknesses = excluded.top_weaknesses,
                improvements = excluded.improvements,
                raw_response = excluded.raw_response,
                scored_at = excluded.scored_at
            "#,
            params![
                row.tale_id,
                row.model,
                row.provider,
                row.weighted_score,
                row.rating,
                row.breakdown,
                row.top_strengths,
                row.top_weaknesses,
                row.improvements,
                row.raw_response,
                row.scored_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All stored scores for one tale, newest first.
    pub fn for_tale(&self, tale_id: &str) -> Result<Vec<ScoreRow>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tale_id, model, provider, weighted_score, rating, breakdown,
                   top_strengths, top_weaknesses, improvements, raw_response, scored_at
            FROM tale_scores WHERE tale_id = ?1 ORDER BY scored_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![tale_id], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn row_to_record(row: &Row<'_>) -> Result<ScoreRow, rusqlite::Error> {
        let scored_at: String = row.get(10)?;
        Ok(ScoreRow {
            tale_id: row.get(0)?,
            model: row.get(1)?,
            provider: row.get(2)?,
            weighted_score: row.get(3)?,
            rating: row.get(4)?,
            breakdown: row.get(5)?,
            top_strengths: row.get(6)?,
            top_weaknesses: row.get(7)?,
            improvements: row.get(8)?,
            raw_response: row.get(9)?,
            scored_at: DateTime::parse_from_rfc3339(&scored_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
