use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{JobStatus, JobType, LogLevel};

fn default_rate_limit() -> f64 {
    1.0
}

fn default_max_pages() -> usize {
    10
}

/// Request inputs carried on the job row so the background handler can
/// pick the job up later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    /// Explicit facility ids; empty means every eligible facility.
    #[serde(default)]
    pub uids: Vec<Uuid>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            uids: Vec::new(),
            rate_limit: default_rate_limit(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub total_items: i64,
    pub processed_items: i64,
    pub error_count: i64,
    pub params: Json<JobParams>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct JobLog {
    pub id: i64,
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job_type: JobType, params: JobParams) -> Result<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Queued,
            total_items: 0,
            processed_items: 0,
            error_count: 0,
            params: Json(params),
            created_at: Utc::now(),
            finished_at: None,
        };

        sqlx::query(
            r#"INSERT INTO jobs (id, job_type, status, total_items, processed_items, error_count, params, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(job.id)
        .bind(job.job_type)
        .bind(job.status)
        .bind(job.total_items)
        .bind(job.processed_items)
        .bind(job.error_count)
        .bind(job.params.clone())
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<JobStatus>> {
        let status: Option<JobStatus> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(status)
    }

    /// Running jobs first, then queued, then the rest newest-first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"SELECT * FROM jobs
               ORDER BY
                   CASE status WHEN 'running' THEN 0 WHEN 'queued' THEN 1 ELSE 2 END,
                   created_at DESC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    pub async fn first_queued(&self) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = 'queued' ORDER BY created_at LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// queued -> running. `total_items` is fixed here and never changes
    /// afterwards.
    pub async fn start(&self, id: Uuid, total_items: i64) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'running', total_items = ? WHERE id = ? AND status = 'queued'",
        )
        .bind(total_items)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn inc_processed(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET processed_items = processed_items + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn inc_error(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET error_count = error_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Terminal transition at the end of a run: a still-running job becomes
    /// completed; a cancellation observed mid-run is left as cancelled.
    /// `finished_at` is stamped either way.
    pub async fn finalize(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'completed' WHERE id = ? AND status = 'running'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("UPDATE jobs SET finished_at = ? WHERE id = ? AND finished_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn fail(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'failed', finished_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Request cancellation. Returns false when the job was already
    /// terminal.
    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE jobs SET status = 'cancelled', finished_at = ?
               WHERE id = ? AND status IN ('queued', 'running')"#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
        sqlx::query("INSERT INTO job_logs (job_id, timestamp, level, message) VALUES (?, ?, ?, ?)")
            .bind(job_id)
            .bind(Utc::now())
            .bind(level)
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Last `limit` log lines in chronological order.
    pub async fn logs_tail(&self, job_id: Uuid, limit: i64) -> Result<Vec<JobLog>> {
        let mut logs = sqlx::query_as::<_, JobLog>(
            "SELECT * FROM job_logs WHERE job_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        logs.reverse();
        Ok(logs)
    }

    pub async fn count_logs_with_prefix(
        &self,
        job_id: Uuid,
        level: LogLevel,
        prefix: &str,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_logs WHERE job_id = ? AND level = ? AND message LIKE ?",
        )
        .bind(job_id)
        .bind(level)
        .bind(format!("{prefix}%"))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Timestamps of the most recent per-item completions (SUCCESS, WARNING
    /// or ERROR lines), newest first. Feeds the remaining-time estimate.
    pub async fn completion_timestamps(
        &self,
        job_id: Uuid,
        limit: i64,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r#"SELECT timestamp FROM job_logs
               WHERE job_id = ? AND level IN ('SUCCESS', 'WARNING', 'ERROR')
               ORDER BY id DESC LIMIT ?"#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(ts,)| ts).collect())
    }

    pub async fn first_log_timestamp(&self, job_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT timestamp FROM job_logs WHERE job_id = ? ORDER BY id LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(ts,)| ts))
    }

    /// Wipe job history; used by uploads with `reset_db=true`.
    pub async fn reset(&self) -> Result<()> {
        sqlx::query("DELETE FROM job_logs").execute(&self.pool).await?;
        sqlx::query("DELETE FROM jobs").execute(&self.pool).await?;

        Ok(())
    }
}
