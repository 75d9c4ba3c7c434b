use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::{redirect, Client};

const HEAD_TIMEOUT_SEC: u64 = 2;
const GET_TIMEOUT_SEC: u64 = 10;

/// Desktop user agents rotated per request.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Standard headers with a randomly chosen user agent.
pub fn request_headers() -> HeaderMap {
    let ua = USER_AGENTS[rand::random_range(0..USER_AGENTS.len())];

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(ua));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("tr-TR,tr;q=0.9,en;q=0.8"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://duckduckgo.com/"));
    headers
}

/// Client for reachability probes: short timeout, no redirect following
/// (the Location header is inspected instead).
pub fn build_head_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(HEAD_TIMEOUT_SEC))
        .redirect(redirect::Policy::none())
        .build()
}

/// Client for content fetches: follows redirects.
pub fn build_get_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(GET_TIMEOUT_SEC))
        .redirect(redirect::Policy::limited(10))
        .build()
}
