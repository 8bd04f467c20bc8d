//! Analysis history
//!
//! Reports are cached per (user, document id) as serialized JSON. The store
//! is history only: a lost row never changes what a new analysis returns.

use async_trait::async_trait;
use chrono::SecondsFormat;
use shared_types::{AnalysisReport, AnalysisSummary};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored report is unreadable: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Insert or replace the report for `user_id`
    async fn save(&self, user_id: &str, report: &AnalysisReport) -> Result<(), StoreError>;

    async fn get(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<Option<AnalysisReport>, StoreError>;

    /// Most recent first
    async fn list(&self, user_id: &str, limit: u32) -> Result<Vec<AnalysisSummary>, StoreError>;
}

/// SQLite-backed history
#[derive(Debug, Clone)]
pub struct SqliteAnalysisStore {
    pool: SqlitePool,
}

impl SqliteAnalysisStore {
    /// Connect and create the schema if needed.
    ///
    /// `sqlite::memory:` gets a single long-lived connection so every query
    /// sees the same database.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to database: {}", database_url);

        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                user_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                analyzed_at TEXT NOT NULL,
                summary_json TEXT NOT NULL,
                report_json TEXT NOT NULL,
                PRIMARY KEY (user_id, document_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_analyses_user_time ON analyses(user_id, analyzed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for SqliteAnalysisStore {
    async fn save(&self, user_id: &str, report: &AnalysisReport) -> Result<(), StoreError> {
        let summary_json = serde_json::to_string(&report.summary())?;
        let report_json = serde_json::to_string(report)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO analyses (user_id, document_id, analyzed_at, summary_json, report_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&report.document_id)
        .bind(report.analyzed_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(&summary_json)
        .bind(&report_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<Option<AnalysisReport>, StoreError> {
        let row: Option<String> = sqlx::query_scalar(
            "SELECT report_json FROM analyses WHERE user_id = ? AND document_id = ?",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn list(&self, user_id: &str, limit: u32) -> Result<Vec<AnalysisSummary>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT summary_json FROM analyses
            WHERE user_id = ?
            ORDER BY analyzed_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }
}
