use chrono::Utc;
use color_eyre::Result;
use sqlx::SqlitePool;
use tracing::debug;

use crate::types::ValidationVerdict;

const DNS_TTL_SECS: f64 = 7.0 * 24.0 * 3600.0;
const DOMAIN_TTL_SECS: f64 = 7.0 * 24.0 * 3600.0;
const VALIDATION_TTL_SECS: f64 = 7.0 * 24.0 * 3600.0;
const SEARCH_TTL_SECS: f64 = 24.0 * 3600.0;

/// Result of a cached HTTP HEAD probe.
#[derive(Debug, Clone)]
pub struct CachedDomainCheck {
    pub status_code: i64,
    pub final_url: Option<String>,
}

/// TTL-backed cache over four SQLite tables: DNS resolution, HEAD probes,
/// content validation, search results.
///
/// Every read past its namespace TTL is treated as a miss. All operations
/// are best-effort: a cache failure is logged at debug and the caller
/// proceeds as on a miss.
#[derive(Clone)]
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_ts() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    fn is_fresh(checked_at: f64, ttl_secs: f64) -> bool {
        Self::now_ts() - checked_at < ttl_secs
    }

    pub async fn get_dns(&self, domain: &str) -> Option<bool> {
        match self.fetch_dns(domain).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!("dns cache read failed for {}: {:?}", domain, e);
                None
            }
        }
    }

    async fn fetch_dns(&self, domain: &str) -> Result<Option<bool>> {
        let row: Option<(i64, f64)> =
            sqlx::query_as("SELECT domain_exists, checked_at FROM dns_cache WHERE domain = ?")
                .bind(domain.to_lowercase())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(exists, checked_at)| {
            Self::is_fresh(checked_at, DNS_TTL_SECS).then_some(exists != 0)
        }))
    }

    pub async fn set_dns(&self, domain: &str, exists: bool) {
        let result = sqlx::query(
            r#"INSERT INTO dns_cache (domain, domain_exists, checked_at)
               VALUES (?, ?, ?)
               ON CONFLICT(domain) DO UPDATE SET
                   domain_exists = excluded.domain_exists,
                   checked_at = excluded.checked_at"#,
        )
        .bind(domain.to_lowercase())
        .bind(exists as i64)
        .bind(Self::now_ts())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!("dns cache write failed for {}: {:?}", domain, e);
        }
    }

    pub async fn get_domain(&self, domain: &str) -> Option<CachedDomainCheck> {
        match self.fetch_domain(domain).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!("domain cache read failed for {}: {:?}", domain, e);
                None
            }
        }
    }

    async fn fetch_domain(&self, domain: &str) -> Result<Option<CachedDomainCheck>> {
        let row: Option<(i64, Option<String>, f64)> = sqlx::query_as(
            "SELECT status_code, final_url, checked_at FROM domain_cache WHERE domain = ?",
        )
        .bind(domain.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(status_code, final_url, checked_at)| {
            Self::is_fresh(checked_at, DOMAIN_TTL_SECS).then_some(CachedDomainCheck {
                status_code,
                final_url,
            })
        }))
    }

    pub async fn set_domain(&self, domain: &str, status_code: i64, final_url: Option<&str>) {
        let result = sqlx::query(
            r#"INSERT INTO domain_cache (domain, status_code, final_url, checked_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(domain) DO UPDATE SET
                   status_code = excluded.status_code,
                   final_url = excluded.final_url,
                   checked_at = excluded.checked_at"#,
        )
        .bind(domain.to_lowercase())
        .bind(status_code)
        .bind(final_url)
        .bind(Self::now_ts())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!("domain cache write failed for {}: {:?}", domain, e);
        }
    }

    pub async fn get_validation(&self, url: &str) -> Option<ValidationVerdict> {
        match self.fetch_validation(url).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!("validation cache read failed for {}: {:?}", url, e);
                None
            }
        }
    }

    async fn fetch_validation(&self, url: &str) -> Result<Option<ValidationVerdict>> {
        let row: Option<(i64, f64, String, f64)> = sqlx::query_as(
            "SELECT is_hotel, confidence, indicators, checked_at FROM validation_cache WHERE url = ?",
        )
        .bind(url.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(is_hotel, confidence, indicators, checked_at)| {
            if !Self::is_fresh(checked_at, VALIDATION_TTL_SECS) {
                return None;
            }
            let indicators = serde_json::from_str(&indicators).unwrap_or_default();
            Some(ValidationVerdict {
                is_hotel: is_hotel != 0,
                confidence,
                indicators,
            })
        }))
    }

    /// Transient validation failures must never be cached; callers only
    /// pass definitive verdicts here.
    pub async fn set_validation(&self, url: &str, verdict: &ValidationVerdict) {
        let indicators = serde_json::to_string(&verdict.indicators).unwrap_or("[]".to_string());

        let result = sqlx::query(
            r#"INSERT INTO validation_cache (url, is_hotel, confidence, indicators, checked_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(url) DO UPDATE SET
                   is_hotel = excluded.is_hotel,
                   confidence = excluded.confidence,
                   indicators = excluded.indicators,
                   checked_at = excluded.checked_at"#,
        )
        .bind(url.to_lowercase())
        .bind(verdict.is_hotel as i64)
        .bind(verdict.confidence)
        .bind(indicators)
        .bind(Self::now_ts())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!("validation cache write failed for {}: {:?}", url, e);
        }
    }

    pub async fn get_search(&self, query: &str) -> Option<serde_json::Value> {
        match self.fetch_search(query).await {
            Ok(hit) => hit,
            Err(e) => {
                debug!("search cache read failed for {:?}: {:?}", query, e);
                None
            }
        }
    }

    async fn fetch_search(&self, query: &str) -> Result<Option<serde_json::Value>> {
        let row: Option<(String, f64)> =
            sqlx::query_as("SELECT results, searched_at FROM search_cache WHERE query_hash = ?")
                .bind(Self::query_hash(query))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(results, searched_at)| {
            if !Self::is_fresh(searched_at, SEARCH_TTL_SECS) {
                return None;
            }
            serde_json::from_str(&results).ok()
        }))
    }

    pub async fn set_search(&self, query: &str, results: &serde_json::Value) {
        let result = sqlx::query(
            r#"INSERT INTO search_cache (query_hash, results, searched_at)
               VALUES (?, ?, ?)
               ON CONFLICT(query_hash) DO UPDATE SET
                   results = excluded.results,
                   searched_at = excluded.searched_at"#,
        )
        .bind(Self::query_hash(query))
        .bind(results.to_string())
        .bind(Self::now_ts())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!("search cache write failed for {:?}: {:?}", query, e);
        }
    }

    fn query_hash(query: &str) -> String {
        format!("{:x}", md5::compute(query.to_lowercase()))
    }

    /// Delete entries older than each namespace's TTL. Returns rows removed.
    pub async fn sweep(&self) -> Result<u64> {
        let now = Self::now_ts();
        let mut removed = 0;

        for (table, column, ttl) in [
            ("dns_cache", "checked_at", DNS_TTL_SECS),
            ("domain_cache", "checked_at", DOMAIN_TTL_SECS),
            ("validation_cache", "checked_at", VALIDATION_TTL_SECS),
            ("search_cache", "searched_at", SEARCH_TTL_SECS),
        ] {
            let result = sqlx::query(&format!("DELETE FROM {table} WHERE {column} < ?"))
                .bind(now - ttl)
                .execute(&self.pool)
                .await?;
            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
