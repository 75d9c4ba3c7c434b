use std::collections::HashMap;
use std::time::Duration;

use futures::{stream, StreamExt};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, info};

use crate::repository::CacheRepository;

const DNS_TIMEOUT: Duration = Duration::from_secs(2);

/// Batched host resolution with a cache in front. DNS refusal is roughly an
/// order of magnitude faster than a TCP probe, and most guessed candidate
/// domains do not exist.
pub struct DnsProber {
    resolver: TokioAsyncResolver,
    cache: CacheRepository,
    concurrency: usize,
}

impl DnsProber {
    pub fn new(cache: CacheRepository, concurrency: usize) -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });

        Self {
            resolver,
            cache,
            concurrency,
        }
    }

    /// Host portion of a URL: scheme, `www.` prefix and path stripped.
    pub fn extract_host(url: &str) -> String {
        let host = url
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_start_matches("www.");
        host.split('/').next().unwrap_or("").to_lowercase()
    }

    /// Does the host resolve? Definitive answers are cached; timeouts and
    /// other transient resolver errors are not.
    pub async fn check(&self, host: &str) -> bool {
        if let Some(cached) = self.cache.get_dns(host).await {
            debug!("[DNS] cache hit for {}: {}", host, cached);
            return cached;
        }

        match tokio::time::timeout(DNS_TIMEOUT, self.resolver.lookup_ip(host)).await {
            Ok(Ok(_)) => {
                self.cache.set_dns(host, true).await;
                true
            }
            Ok(Err(e)) => {
                if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    self.cache.set_dns(host, false).await;
                } else {
                    debug!("[DNS] error checking {}: {:?}", host, e);
                }
                false
            }
            Err(_) => {
                debug!("[DNS] timeout checking {}", host);
                false
            }
        }
    }

    /// Filter URLs to those whose host resolves, preserving input order.
    /// Each unique host is resolved at most once.
    pub async fn filter(&self, urls: Vec<String>) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for url in &urls {
            let host = Self::extract_host(url);
            if !host.is_empty() && !hosts.contains(&host) {
                hosts.push(host);
            }
        }

        let results: HashMap<String, bool> = stream::iter(hosts)
            .map(|host| async move {
                let exists = self.check(&host).await;
                (host, exists)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let kept: Vec<String> = urls
            .into_iter()
            .filter(|url| {
                results
                    .get(&Self::extract_host(url))
                    .copied()
                    .unwrap_or(false)
            })
            .collect();

        info!("[DNS] {} URLs passed the DNS pre-check", kept.len());
        kept
    }
}
