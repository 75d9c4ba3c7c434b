pub mod circuit_breaker;
pub mod discovery;
pub mod dns_prober;
pub mod email_crawler;
pub mod email_extractor;
pub mod http_probe;
pub mod normalizer;
pub mod search_client;
pub mod validator;

use std::sync::Arc;

use color_eyre::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::repository::CacheRepository;
use circuit_breaker::CircuitBreaker;
use dns_prober::DnsProber;
use http_probe::HttpProbe;
use search_client::SearchClient;
use validator::ContentValidator;

/// The enrichment pipeline's shared collaborators, built once at startup
/// and threaded through discovery and crawl calls. Holds the two
/// preconfigured circuit breakers and the TTL cache.
pub struct Services {
    pub cache: CacheRepository,
    pub dns: DnsProber,
    pub probe: HttpProbe,
    pub search: SearchClient,
    pub validator: ContentValidator,
}

impl Services {
    pub fn new(config: &Config, cache_pool: SqlitePool) -> Result<Self> {
        let cache = CacheRepository::new(cache_pool);

        let http_breaker = Arc::new(CircuitBreaker::http());
        let search_breaker = Arc::new(CircuitBreaker::search());

        Ok(Self {
            dns: DnsProber::new(cache.clone(), config.dns_concurrency),
            probe: HttpProbe::new(http_breaker, cache.clone())?,
            search: SearchClient::new(config.search_url.clone(), search_breaker, cache.clone())?,
            validator: ContentValidator::new(cache.clone()),
            cache,
        })
    }
}
