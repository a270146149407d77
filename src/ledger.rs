//! Durable audit ledger for jobs (SQLite via sqlx).
//!
//! Mirrors the in-memory job table: one row per job with state, counters,
//! and final stats as JSON. The engine runs fine without it; when attached,
//! write failures are logged by the coordinator and never fail a job.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use crate::job::{unix_timestamp, JobId, JobSnapshot, JobState, JobStats};

/// Row view returned by `list_jobs`, newest first.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub id: JobId,
    pub tenant: String,
    pub submitter: String,
    pub state: JobState,
    pub total_records: i64,
    pub processed_records: i64,
    pub error_records: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Handle to the SQLite-backed job ledger.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/chunkwell/jobs.db`.
#[derive(Clone)]
pub struct JobLedger {
    pool: Pool<Sqlite>,
}

impl JobLedger {
    /// Open (or create) the default ledger and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("chunkwell")?;
        let state_dir = xdg_dirs.get_state_home();
        let db_path = state_dir.join("jobs.db");

        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let ledger = JobLedger { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// Open a ledger at an explicit path (tests, embedded deployments).
    pub async fn open_at(path: &std::path::Path) -> Result<Self> {
        let uri = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let ledger = JobLedger { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// In-memory ledger (no disk I/O). Single connection so the pool cannot
    /// hand back a different empty database.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let ledger = JobLedger { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<()> {
        // Single-table schema: job rows only. Per-batch results are not
        // persisted; they exist only until folded into the counters.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY,
                tenant TEXT NOT NULL,
                submitter TEXT NOT NULL,
                state TEXT NOT NULL,
                total_records INTEGER NOT NULL DEFAULT 0,
                processed_records INTEGER NOT NULL DEFAULT 0,
                error_records INTEGER NOT NULL DEFAULT 0,
                stats_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a freshly submitted job (state Queued, zero counters).
    pub async fn insert_job(&self, snapshot: &JobSnapshot) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, tenant, submitter, state,
                total_records, processed_records, error_records,
                stats_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, NULL, ?5, ?6)
            "#,
        )
        .bind(snapshot.id as i64)
        .bind(&snapshot.tenant)
        .bind(&snapshot.submitter)
        .bind(snapshot.state.as_str())
        .bind(snapshot.created_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update the state of an existing job row.
    pub async fn set_state(&self, id: JobId, state: JobState) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(state.as_str())
        .bind(now)
        .bind(id as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a job's terminal state and final counters, with the full
    /// stats kept as JSON for audit.
    pub async fn record_final(&self, stats: &JobStats) -> Result<()> {
        let now = unix_timestamp();
        let stats_json = serde_json::to_string(stats)?;
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?1,
                total_records = ?2,
                processed_records = ?3,
                error_records = ?4,
                stats_json = ?5,
                updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(stats.state.as_str())
        .bind(stats.total_records as i64)
        .bind(stats.processed_records as i64)
        .bind(stats.error_records as i64)
        .bind(stats_json)
        .bind(now)
        .bind(stats.job_id as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List all job rows, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<LedgerRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant, submitter, state,
                   total_records, processed_records, error_records,
                   created_at, updated_at
            FROM jobs
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let state_str: String = row.get("state");
            out.push(LedgerRow {
                id: id as JobId,
                tenant: row.get("tenant"),
                submitter: row.get("submitter"),
                state: JobState::parse(&state_str),
                total_records: row.get("total_records"),
                processed_records: row.get("processed_records"),
                error_records: row.get("error_records"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(out)
    }

    /// Final stats JSON for one job, if recorded.
    pub async fn final_stats(&self, id: JobId) -> Result<Option<JobStats>> {
        let row = sqlx::query(
            r#"
            SELECT stats_json FROM jobs WHERE id = ?1
            "#,
        )
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: Option<String> = row.get("stats_json");
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
