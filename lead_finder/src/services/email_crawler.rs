use std::collections::{HashMap, HashSet, VecDeque};

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::services::email_extractor::{
    extract_emails_from_html, extract_emails_from_text, is_valid_email, score_email,
};
use crate::services::http_probe::HttpProbe;

/// URL-path hints that a page likely lists contact info.
pub const PRIORITY_KEYWORDS: [&str; 9] = [
    "contact",
    "iletisim",
    "about",
    "hakkimizda",
    "info",
    "ulasim",
    "bize-ulasin",
    "bizeulasin",
    "communication",
];

const SKIP_EXTENSIONS: [&str; 8] = [
    ".pdf", ".jpg", ".png", ".gif", ".css", ".js", ".zip", ".doc",
];

const HIGH_CONFIDENCE_SCORE: i32 = 70;

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

fn is_priority_url(url: &str) -> bool {
    let url = url.to_lowercase();
    PRIORITY_KEYWORDS.iter().any(|kw| url.contains(kw))
}

/// Same-host anchor targets of a page, absolutized, fragments stripped.
fn extract_links(html: &str, page_url: &Url, host: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut links = Vec::new();

    for anchor in doc.select(&LINK_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.starts_with("mailto:") || href.starts_with("javascript:") {
            continue;
        }

        let Ok(mut absolute) = page_url.join(href) else {
            continue;
        };
        absolute.set_fragment(None);

        if netloc(&absolute) != host {
            continue;
        }

        links.push(absolute.to_string());
    }

    links
}

/// Priority-biased BFS over one host: contact-looking pages jump the
/// queue, every page feeds the extractor, and the best score per address
/// wins. Never visits more than `max_pages` pages, never leaves the root
/// host, and never propagates a per-page failure.
pub async fn crawl_for_email(
    probe: &HttpProbe,
    start_url: &str,
    max_pages: usize,
) -> Option<(String, i32)> {
    let Ok(root) = Url::parse(start_url) else {
        debug!("[CRAWLER] invalid start url {}", start_url);
        return None;
    };
    let host = netloc(&root);

    let mut visited: HashSet<String> = HashSet::new();
    let mut enqueued: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut found: HashMap<String, i32> = HashMap::new();

    queue.push_back(start_url.to_string());
    enqueued.insert(start_url.to_string());

    let mut pages_crawled = 0;
    debug!("[CRAWLER] starting crawl of {}", start_url);

    while let Some(page_url) = queue.pop_front() {
        if pages_crawled >= max_pages {
            break;
        }
        if visited.contains(&page_url) {
            continue;
        }

        let lowered = page_url.to_lowercase();
        if SKIP_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
            continue;
        }

        let response = match probe.get(&page_url).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("[CRAWLER] request error for {}: {:?}", page_url, e);
                continue;
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            continue;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("[CRAWLER] body error for {}: {:?}", page_url, e);
                continue;
            }
        };

        visited.insert(page_url.clone());
        pages_crawled += 1;

        let mut page_emails = extract_emails_from_html(&body);
        // a raw-text pass catches addresses hidden from the DOM walk
        page_emails.extend(extract_emails_from_text(&body));

        let priority_page = is_priority_url(&page_url);
        for email in page_emails {
            if !is_valid_email(&email) {
                continue;
            }
            let mut score = score_email(&email, &host);
            if priority_page {
                score += 15;
            }
            let entry = found.entry(email.clone()).or_insert(i32::MIN);
            if score > *entry {
                *entry = score;
                debug!("[CRAWLER] found email {} (score: {})", email, score);
            }
        }

        if let Ok(parsed) = Url::parse(&page_url) {
            for link in extract_links(&body, &parsed, &host) {
                if visited.contains(&link) || enqueued.contains(&link) {
                    continue;
                }
                enqueued.insert(link.clone());
                if is_priority_url(&link) {
                    queue.push_front(link);
                } else {
                    queue.push_back(link);
                }
            }
        }

        if let Some((email, score)) = best_of(&found) {
            if score >= HIGH_CONFIDENCE_SCORE {
                info!("[CRAWLER] high-confidence email found: {}", email);
                return Some((email, score));
            }
        }
    }

    let best = best_of(&found);
    match &best {
        Some((email, score)) => info!("[CRAWLER] best email: {} (score: {})", email, score),
        None => debug!("[CRAWLER] no emails found on {}", start_url),
    }
    best
}

fn best_of(found: &HashMap<String, i32>) -> Option<(String, i32)> {
    found
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(email, score)| (email.clone(), *score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{init_cache_schema, CacheRepository};
    use crate::services::circuit_breaker::CircuitBreaker;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_probe() -> HttpProbe {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_cache_schema(&pool).await.unwrap();
        HttpProbe::new(Arc::new(CircuitBreaker::http()), CacheRepository::new(pool)).unwrap()
    }

    fn html_page(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
    }

    #[tokio::test]
    async fn priority_pages_jump_the_queue() {
        let server = MockServer::start().await;
        let host = server.uri();

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<html><body>
                    <a href="{host}/rooms">Rooms</a>
                    <a href="{host}/iletisim">İletişim</a>
                </body></html>"#
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/iletisim"))
            .respond_with(html_page(
                "<html><body>rezervasyon@pearlhotel.com</body></html>",
            ))
            .mount(&server)
            .await;

        // linked first but crawled never: the contact page jumps ahead and
        // the two-page budget is spent before /rooms comes up
        Mock::given(method("GET"))
            .and(path("/rooms"))
            .respond_with(html_page("<html><body>oda</body></html>"))
            .expect(0)
            .mount(&server)
            .await;

        let probe = test_probe().await;
        let (email, score) = crawl_for_email(&probe, &host, 2).await.unwrap();

        assert_eq!(email, "rezervasyon@pearlhotel.com");
        // exact preferred local (40) + priority page bonus (15)
        assert_eq!(score, 55);
    }

    #[tokio::test]
    async fn respects_max_pages() {
        let server = MockServer::start().await;
        let host = server.uri();

        // every page links to the next, no emails anywhere
        for i in 0..5 {
            Mock::given(method("GET"))
                .and(path(format!("/p{i}")))
                .respond_with(html_page(&format!(
                    r#"<html><body><a href="{host}/p{}">next</a></body></html>"#,
                    i + 1
                )))
                .mount(&server)
                .await;
        }

        let probe = test_probe().await;
        let result = crawl_for_email(&probe, &format!("{host}/p0"), 3).await;
        assert!(result.is_none());

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 3);
    }

    #[tokio::test]
    async fn never_leaves_the_root_host() {
        let server = MockServer::start().await;
        let host = server.uri();

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(
                r#"<html><body>
                    <a href="http://other.example/contact">elsewhere</a>
                    <a href="/kat.pdf">brochure</a>
                </body></html>"#,
            ))
            .mount(&server)
            .await;

        let probe = test_probe().await;
        let result = crawl_for_email(&probe, &host, 10).await;
        assert!(result.is_none());

        // only the root page itself was fetched
        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn non_html_pages_are_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("info@hotel.com".to_string(), "application/json"),
            )
            .mount(&server)
            .await;

        let probe = test_probe().await;
        assert!(crawl_for_email(&probe, &server.uri(), 10).await.is_none());
    }

    #[tokio::test]
    async fn per_page_failures_do_not_abort_the_crawl() {
        let server = MockServer::start().await;
        let host = server.uri();

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(&format!(
                r#"<html><body>
                    <a href="{host}/broken">broken</a>
                    <a href="{host}/ok">ok</a>
                </body></html>"#
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(html_page(
                "<html><body>info@pearlhotel.com</body></html>",
            ))
            .mount(&server)
            .await;

        let probe = test_probe().await;
        let (email, _) = crawl_for_email(&probe, &host, 10).await.unwrap();
        assert_eq!(email, "info@pearlhotel.com");
    }

    #[tokio::test]
    async fn obfuscated_emails_are_recovered_during_crawl() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page(
                "<html><body>Bize yazın: info [at] foo [dot] com</body></html>",
            ))
            .mount(&server)
            .await;

        let probe = test_probe().await;
        let (email, _) = crawl_for_email(&probe, &server.uri(), 10).await.unwrap();
        assert_eq!(email, "info@foo.com");
    }
}
