#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockExternalServices {
    pub search: MockServer,
    pub site: MockServer,
}

impl MockExternalServices {
    pub async fn start() -> Self {
        Self {
            search: MockServer::start().await,
            site: MockServer::start().await,
        }
    }

    pub fn search_url(&self) -> String {
        format!("{}/html/", self.search.uri())
    }

    pub fn site_url(&self) -> String {
        self.site.uri()
    }

    /// Serve a search result page listing the given outbound links.
    pub async fn setup_search_results(&self, urls: &[&str]) {
        let anchors: String = urls
            .iter()
            .map(|u| format!(r#"<a href="{u}">{u}</a>"#))
            .collect();
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("<html><body>{anchors}</body></html>")),
            )
            .mount(&self.search)
            .await;
    }

    /// Serve an HTML page on the fake facility site.
    pub async fn setup_site_page(&self, page_path: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(page_path.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"),
            )
            .mount(&self.site)
            .await;
    }
}
