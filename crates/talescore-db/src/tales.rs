//! Tales store: the content rows being scored, keyed by slug.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

/// A stored content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaleRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub status: String,
    /// Average weighted score across models, if scored
    pub stepten_score: Option<f64>,
    /// JSON blob with per-model results
    pub score_breakdown: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Filter options for selecting tales to score.
#[derive(Debug, Default, Clone)]
pub struct TaleFilter {
    pub slug: Option<String>,
}

/// Tales store with a borrowed connection.
pub struct Tales<'db> {
    conn: MutexGuard<'db, Connection>,
}

const TALE_COLUMNS: &str =
    "id, slug, title, excerpt, content, status, stepten_score, score_breakdown, updated_at";

impl<'db> Tales<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Save a tale record (insert or update by id).
    pub fn save(&self, record: &TaleRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            r#"
            INSERT INTO tales (id, slug, title, excerpt, content, status, stepten_score, score_breakdown, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                title = excluded.title,
                excerpt = excluded.excerpt,
                content = excluded.content,
                status = excluded.status,
                stepten_score = excluded.stepten_score,
                score_breakdown = excluded.score_breakdown,
                updated_at = excluded.updated_at
            "#,
            params![
                record.id,
                record.slug,
                record.title,
                record.excerpt,
                record.content,
                record.status,
                record.stepten_score,
                record.score_breakdown,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a tale by slug.
    pub fn get_by_slug(&self, slug: &str) -> Result<Option<TaleRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM tales WHERE slug = ?1", TALE_COLUMNS),
                params![slug],
                Self::row_to_record,
            )
            .optional()
    }

    /// List published tales, optionally restricted to a single slug.
    pub fn list_published(&self, filter: &TaleFilter) -> Result<Vec<TaleRecord>, rusqlite::Error> {
        let mut sql = format!(
            "SELECT {} FROM tales WHERE status = 'published'",
            TALE_COLUMNS
        );
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref slug) = filter.slug {
            sql.push_str(" AND slug = ?");
            param_values.push(Box::new(slug.clone()));
        }

        sql.push_str(" ORDER BY updated_at DESC");

        let sql_params: Vec<&dyn rusqlite::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(sql_params.as_slice(), Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Update a tale's editorial fields by slug. Returns true if a row matched.
    pub fn update_content(
        &self,
        slug: &str,
        title: &str,
        excerpt: Option<&str>,
        content: &str,
    ) -> Result<bool, rusqlite::Error> {
        let rows = self.conn.execute(
            r#"
            UPDATE tales
            SET title = ?2, excerpt = ?3, content = ?4, updated_at = ?5
            WHERE slug = ?1
            "#,
            params![slug, title, excerpt, content, Utc::now().to_rfc3339()],
        )?;
        Ok(rows > 0)
    }

    /// Write back the averaged score and per-model breakdown after a run.
    pub fn set_average_score(
        &self,
        id: &str,
        average: f64,
        breakdown_json: &str,
    ) -> Result<bool, rusqlite::Error> {
        let rows = self.conn.execute(
            r#"
            UPDATE tales
            SET stepten_score = ?2, score_breakdown = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![id, average, breakdown_json, Utc::now().to_rfc3339()],
        )?;
        Ok(rows > 0)
    }

    fn row_to_record(row: &Row<'_>) -> Result<TaleRecord, rusqlite::Error> {
        let updated_at: String = row.get(8)?;
        Ok(TaleRecord {
            id: row.get(0)?,
            slug: row.get(1)?,
            title: row.get(2)?,
            excerpt: row.get(3)?,
            content: row.get(4)?,
            status: row.get(5)?,
            stepten_score: row.get(6)?,
            score_breakdown: row.get(7)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
