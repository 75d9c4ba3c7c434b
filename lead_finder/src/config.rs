use std::env;

use color_eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub cache_db_url: String,
    pub log_level: String,
    pub search_url: String,
    pub bind_addr: String,
    pub worker_count: usize,
    pub dns_concurrency: usize,
    pub job_poll_interval_ms: u64,
}

impl Config {
    pub fn new_from_env() -> Result<Self> {
        Ok(Self {
            db_url: env::var("DATABASE_URL").unwrap_or("sqlite://data/leads.db?mode=rwc".to_string()),
            cache_db_url: env::var("CACHE_DATABASE_URL")
                .unwrap_or("sqlite://data/discovery_cache.db?mode=rwc".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or("info".to_string()),
            search_url: env::var("SEARCH_URL")
                .unwrap_or("https://html.duckduckgo.com/html/".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or("0.0.0.0:3010".to_string()),
            worker_count: env::var("WORKER_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            dns_concurrency: env::var("DNS_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            job_poll_interval_ms: env::var("JOB_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),
        })
    }

    // Test helper
    pub fn new_for_test(search_url: String) -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            cache_db_url: "sqlite::memory:".to_string(),
            log_level: "info".to_string(),
            search_url,
            bind_addr: "127.0.0.1:0".to_string(),
            worker_count: 3,
            dns_concurrency: 10,
            job_poll_interval_ms: 50,
        }
    }
}
