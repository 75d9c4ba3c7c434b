use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use once_cell::sync::Lazy;
use reqwest_middleware::ClientWithMiddleware;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http_client::request_headers;
use crate::repository::CacheRepository;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::utils::build_reqwest_retry_client;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RESULT_ANCHORS: usize = 50;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// One outbound anchor from a search result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// Client for a public HTML-rendering search endpoint. Queries are POSTed
/// as form data, responses parsed for result anchors, and cached for a day
/// keyed on the lowercased query. Calls run through the `search` breaker
/// and a retrying middleware client.
pub struct SearchClient {
    client: ClientWithMiddleware,
    endpoint: String,
    breaker: Arc<CircuitBreaker>,
    cache: CacheRepository,
}

impl SearchClient {
    pub fn new(
        endpoint: String,
        breaker: Arc<CircuitBreaker>,
        cache: CacheRepository,
    ) -> Result<Self> {
        Ok(Self {
            client: build_reqwest_retry_client(SEARCH_TIMEOUT, 4_000, 10_000)?,
            endpoint,
            breaker,
            cache,
        })
    }

    /// True while the breaker rejects calls outright; the discovery engine
    /// skips its search strategy entirely in that window.
    pub fn is_open(&self) -> bool {
        self.breaker.state() == CircuitState::Open
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Some(cached) = self.cache.get_search(query).await {
            if let Ok(hits) = serde_json::from_value::<Vec<SearchHit>>(cached) {
                debug!("[SEARCH] cache hit for {:?}", query);
                return Ok(hits);
            }
        }

        self.breaker.try_acquire()?;

        let response = self
            .client
            .post(&self.endpoint)
            .headers(request_headers())
            .form(&[("q", query)])
            .send()
            .await;

        match response {
            // the endpoint answers 202 while it is still rendering
            Ok(resp) if matches!(resp.status().as_u16(), 200 | 202) => {
                self.breaker.record_success();
                let html = resp.text().await.unwrap_or_default();
                let hits = parse_result_anchors(&html);

                self.cache
                    .set_search(query, &serde_json::to_value(&hits)?)
                    .await;

                Ok(hits)
            }
            Ok(resp) => {
                self.breaker.record_failure();
                warn!("[SEARCH] endpoint returned HTTP {}", resp.status());
                Err(eyre!("search endpoint returned HTTP {}", resp.status()))
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!("[SEARCH] request failed: {:?}", e);
                Err(e.into())
            }
        }
    }
}

/// Pull outbound result links from a search HTML page: the first 50
/// anchors, internal and relative links dropped, query-param redirect
/// wrappers (`uddg=` / `r=`) unwrapped.
pub fn parse_result_anchors(html: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let mut hits = Vec::new();

    for anchor in doc.select(&ANCHOR_SELECTOR).take(MAX_RESULT_ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with('/') || href.contains("duckduckgo") {
            continue;
        }
        if !href.starts_with("http") {
            continue;
        }

        let title: String = anchor
            .text()
            .collect::<String>()
            .trim()
            .chars()
            .take(100)
            .collect();

        let url = if href.contains("uddg=") || href.contains("r=") {
            decode_redirect_param(href).unwrap_or_else(|| href.to_string())
        } else {
            href.to_string()
        };
        if !url.starts_with("http") {
            continue;
        }

        hits.push(SearchHit { url, title });
    }

    hits
}

fn decode_redirect_param(href: &str) -> Option<String> {
    let query = href.splitn(2, '?').nth(1)?;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "uddg" || key == "r" {
                return urlencoding::decode(value).ok().map(|v| v.into_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::init_cache_schema;
    use sqlx::sqlite::SqlitePoolOptions;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULT_PAGE: &str = r#"
        <html><body>
            <a href="/internal">internal</a>
            <a href="relative.html">relative</a>
            <a href="https://duckduckgo.com/about">about</a>
            <a href="https://html.example/redirect?uddg=http%3A%2F%2Fpearlhotel.com.tr%2F">Pearl Hotel Istanbul</a>
            <a href="http://alexiaresort.com">Alexia Resort</a>
        </body></html>
    "#;

    #[test]
    fn parse_drops_internal_links_and_decodes_redirects() {
        let hits = parse_result_anchors(RESULT_PAGE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "http://pearlhotel.com.tr/");
        assert_eq!(hits[0].title, "Pearl Hotel Istanbul");
        assert_eq!(hits[1].url, "http://alexiaresort.com");
    }

    #[test]
    fn decode_prefers_wrapped_target() {
        assert_eq!(
            decode_redirect_param("https://x.example/l/?uddg=http%3A%2F%2Ffoo.com%2F&rut=abc"),
            Some("http://foo.com/".to_string())
        );
        assert_eq!(
            decode_redirect_param("https://x.example/l/?r=http%3A%2F%2Fbar.com"),
            Some("http://bar.com".to_string())
        );
        assert_eq!(decode_redirect_param("https://x.example/plain"), None);
    }

    async fn test_client(endpoint: String) -> SearchClient {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_cache_schema(&pool).await.unwrap();
        SearchClient::new(
            endpoint,
            Arc::new(CircuitBreaker::search()),
            CacheRepository::new(pool),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn search_posts_form_and_caches_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .and(body_string_contains("q="))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(format!("{}/html/", server.uri())).await;

        let hits = client.search("pearl istanbul hotel İSTANBUL otel").await.unwrap();
        assert_eq!(hits.len(), 2);

        // answered from cache; the mock expects exactly one request
        let cached = client.search("PEARL istanbul hotel İSTANBUL otel").await.unwrap();
        assert_eq!(cached, hits);
    }

    #[tokio::test]
    async fn open_breaker_rejects_without_network() {
        let client = test_client("http://127.0.0.1:1/html/".to_string()).await;
        for _ in 0..5 {
            client.breaker.record_failure();
        }
        assert!(client.is_open());
        assert!(client.search("anything").await.is_err());
    }
}
