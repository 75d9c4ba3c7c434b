use std::sync::Arc;

use color_eyre::Result;
use reqwest::Client;
use tracing::debug;

use crate::http_client::{build_get_client, build_head_client, request_headers};
use crate::repository::CacheRepository;
use crate::services::circuit_breaker::CircuitBreaker;

/// Statuses a HEAD probe accepts as "the domain serves something".
pub const REACHABLE_STATUSES: [u16; 6] = [200, 301, 302, 303, 307, 308];

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Reachable { status: u16, final_url: String },
    Unreachable,
}

/// Thin facade over HTTP with a random UA per request, the `http` circuit
/// breaker in front, and the HEAD-probe cache.
pub struct HttpProbe {
    head_client: Client,
    get_client: Client,
    breaker: Arc<CircuitBreaker>,
    cache: CacheRepository,
}

impl HttpProbe {
    pub fn new(breaker: Arc<CircuitBreaker>, cache: CacheRepository) -> Result<Self> {
        Ok(Self {
            head_client: build_head_client()?,
            get_client: build_get_client()?,
            breaker,
            cache,
        })
    }

    fn cache_key(url: &str) -> String {
        url.trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_lowercase()
    }

    fn outcome_from(status: u16, final_url: String) -> ProbeOutcome {
        if REACHABLE_STATUSES.contains(&status) {
            ProbeOutcome::Reachable { status, final_url }
        } else {
            ProbeOutcome::Unreachable
        }
    }

    /// Reachability probe: HEAD with a 2s timeout, redirects not followed.
    /// The redirect target (when present) becomes the final URL. Responses
    /// are cached; transport errors are not.
    pub async fn head(&self, url: &str) -> ProbeOutcome {
        let key = Self::cache_key(url);
        if let Some(hit) = self.cache.get_domain(&key).await {
            debug!("[PROBE] cache hit for {} -> {}", url, hit.status_code);
            return Self::outcome_from(
                hit.status_code as u16,
                hit.final_url.unwrap_or_else(|| url.to_string()),
            );
        }

        if self.breaker.try_acquire().is_err() {
            debug!("[PROBE] http circuit open, skipping {}", url);
            return ProbeOutcome::Unreachable;
        }

        match self
            .head_client
            .head(url)
            .headers(request_headers())
            .send()
            .await
        {
            Ok(resp) => {
                self.breaker.record_success();
                let status = resp.status().as_u16();

                let final_url = if resp.status().is_redirection() {
                    resp.headers()
                        .get(reqwest::header::LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| url.to_string())
                } else {
                    url.to_string()
                };

                self.cache
                    .set_domain(&key, status as i64, Some(&final_url))
                    .await;

                Self::outcome_from(status, final_url)
            }
            Err(e) => {
                self.breaker.record_failure();
                debug!("[PROBE] HEAD {} failed: {:?}", url, e);
                ProbeOutcome::Unreachable
            }
        }
    }

    /// Content fetch: GET with a 10s timeout, redirects followed. Routed
    /// through the breaker; a circuit-open rejection surfaces as an error.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.breaker.try_acquire()?;

        match self
            .get_client
            .get(url)
            .headers(request_headers())
            .send()
            .await
        {
            Ok(resp) => {
                self.breaker.record_success();
                Ok(resp)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e.into())
            }
        }
    }
}
