mod cache_repo;
mod facility_repo;
mod job_repo;

pub use cache_repo::*;
pub use facility_repo::*;
pub use job_repo::*;

use color_eyre::Result;
use sqlx::SqlitePool;

/// Create catalog tables if missing. Idempotent, run at startup.
pub async fn init_catalog_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS facilities (
            id TEXT PRIMARY KEY,
            raw_id TEXT,
            name TEXT NOT NULL,
            city TEXT NOT NULL,
            district TEXT NOT NULL,
            doc_type TEXT NOT NULL,
            address TEXT,
            website TEXT,
            website_source TEXT,
            website_score REAL NOT NULL DEFAULT 0.0,
            website_status TEXT NOT NULL DEFAULT 'pending',
            email TEXT,
            email_source TEXT,
            email_status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_facilities_raw_id ON facilities (raw_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_facilities_city ON facilities (city)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            job_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            total_items INTEGER NOT NULL DEFAULT 0,
            processed_items INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            params TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            level TEXT NOT NULL,
            message TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_logs_job_id ON job_logs (job_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the four TTL cache tables if missing.
pub async fn init_cache_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dns_cache (
            domain TEXT PRIMARY KEY,
            domain_exists INTEGER NOT NULL,
            checked_at REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS domain_cache (
            domain TEXT PRIMARY KEY,
            status_code INTEGER NOT NULL,
            final_url TEXT,
            checked_at REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS validation_cache (
            url TEXT PRIMARY KEY,
            is_hotel INTEGER NOT NULL,
            confidence REAL NOT NULL,
            indicators TEXT NOT NULL,
            checked_at REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_cache (
            query_hash TEXT PRIMARY KEY,
            results TEXT NOT NULL,
            searched_at REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
