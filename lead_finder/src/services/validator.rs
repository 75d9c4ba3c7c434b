use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::repository::CacheRepository;
use crate::services::http_probe::HttpProbe;
use crate::types::ValidationVerdict;

/// A type keyword inside the host is the strongest single signal.
const DOMAIN_KEYWORDS: [&str; 9] = [
    "hotel", "otel", "resort", "apart", "pansiyon", "villa", "lodge", "inn", "motel",
];

/// Chain brands score nearly as high; their domains rarely say "hotel".
const BRAND_KEYWORDS: [&str; 18] = [
    "hyatt",
    "hilton",
    "marriott",
    "radisson",
    "sheraton",
    "accor",
    "ibis",
    "novotel",
    "mercure",
    "sofitel",
    "ramada",
    "wyndham",
    "holiday inn",
    "crowne plaza",
    "intercontinental",
    "doubletree",
    "hampton",
    "embassy",
];

const ENGLISH_KEYWORDS: [&str; 13] = [
    "hotel",
    "resort",
    "motel",
    "guest house",
    "lodge",
    "inn",
    "villa",
    "room",
    "accommodation",
    "booking",
    "reserve",
    "check-in",
    "check-out",
];

const TURKISH_KEYWORDS: [&str; 15] = [
    "otel",
    "resort",
    "pansiyon",
    "konuk evi",
    "konak",
    "yatakhane",
    "apart",
    "kamp",
    "oda",
    "konaklama",
    "rezervasyon",
    "giriş",
    "çıkış",
    "tur",
    "turizm",
];

static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // +90 532 123 45 67
        Regex::new(r"\+90[\s\-]?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2}").unwrap(),
        // 0212 123 45 67
        Regex::new(r"0[2-5]\d{2}[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2}").unwrap(),
        // 444 1 234
        Regex::new(r"444[\s\-]?\d{1}[\s\-]?\d{3}").unwrap(),
    ]
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>())
}

fn host_of(url: &str) -> String {
    url.trim_start_matches("http://")
        .trim_start_matches("https://")
        .split('/')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Priority-based page classification: domain keywords, then a city match,
/// then HTML content fallbacks. The two strong signals alone are enough to
/// pass without parsing.
pub struct ContentValidator {
    cache: CacheRepository,
}

impl ContentValidator {
    pub fn new(cache: CacheRepository) -> Self {
        Self { cache }
    }

    pub async fn validate(
        &self,
        probe: &HttpProbe,
        url: &str,
        _hotel_name: &str,
        city: &str,
    ) -> ValidationVerdict {
        if let Some(cached) = self.cache.get_validation(url).await {
            debug!("[VALIDATION] cache hit for {}", url);
            return cached;
        }

        let mut score = 0.0;
        let mut indicators = Vec::new();

        let domain = host_of(url);
        if DOMAIN_KEYWORDS.iter().any(|kw| domain.contains(kw)) {
            score += 40.0;
            indicators.push(format!("Hotel keyword in domain: {domain}"));
        } else if BRAND_KEYWORDS.iter().any(|brand| domain.contains(brand)) {
            score += 35.0;
            indicators.push(format!("Hotel brand in domain: {domain}"));
        }

        let response = match probe.get(url).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("[VALIDATION] fetch error for {}: {:?}", url, e);
                return self.verdict_on_fetch_error(url, score, indicators).await;
            }
        };

        if response.status().as_u16() != 200 {
            let verdict = if score >= 40.0 {
                indicators.push("HTTP non-200 but domain is hotel".to_string());
                ValidationVerdict {
                    is_hotel: true,
                    confidence: 80.0,
                    indicators,
                }
            } else {
                ValidationVerdict {
                    is_hotel: false,
                    confidence: 0.0,
                    indicators: vec!["HTTP not 200".to_string()],
                }
            };
            self.cache.set_validation(url, &verdict).await;
            return verdict;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("[VALIDATION] body read error for {}: {:?}", url, e);
                return self.verdict_on_fetch_error(url, score, indicators).await;
            }
        };
        let content = body.to_lowercase();

        // same name and same city is the second strongest signal
        if !city.is_empty() && content.contains(&city.to_lowercase()) {
            score += 40.0;
            indicators.push(format!("City matched: {city}"));
        }

        if score >= 70.0 {
            indicators.push(format!("Fast pass: domain + city = {score} pts"));
            let verdict = ValidationVerdict {
                is_hotel: true,
                confidence: (score + 20.0).min(100.0),
                indicators,
            };
            self.cache.set_validation(url, &verdict).await;
            return verdict;
        }

        if let Some(title) = page_title(&body) {
            let title = title.to_lowercase();
            if title.contains("hotel") || title.contains("otel") || title.contains("resort") {
                score += 20.0;
                indicators.push("Hotel keyword in title".to_string());
            }
        }

        let english = ENGLISH_KEYWORDS
            .iter()
            .filter(|kw| content.contains(*kw))
            .count();
        let turkish = TURKISH_KEYWORDS
            .iter()
            .filter(|kw| content.contains(*kw))
            .count();
        if english >= 2 {
            score += 20.0;
            indicators.push(format!("English keywords: {english}"));
        } else if turkish >= 2 {
            score += 20.0;
            indicators.push(format!("Turkish keywords: {turkish}"));
        }

        if PHONE_PATTERNS.iter().any(|p| p.is_match(&content)) {
            score += 15.0;
            indicators.push("Phone number found".to_string());
        }

        let verdict = if score >= 50.0 {
            ValidationVerdict {
                is_hotel: true,
                confidence: score.min(100.0),
                indicators,
            }
        } else {
            indicators.push("Score too low".to_string());
            ValidationVerdict {
                is_hotel: false,
                confidence: score,
                indicators,
            }
        };
        self.cache.set_validation(url, &verdict).await;
        verdict
    }

    /// A fetch failure with a hotel-looking domain still passes (and is
    /// cached); otherwise the negative verdict is NOT cached, so the next
    /// job retries past the transient failure.
    async fn verdict_on_fetch_error(
        &self,
        url: &str,
        score: f64,
        mut indicators: Vec<String>,
    ) -> ValidationVerdict {
        if score >= 40.0 {
            indicators.push("Content error but domain is hotel".to_string());
            let verdict = ValidationVerdict {
                is_hotel: true,
                confidence: (score + 10.0).min(100.0),
                indicators,
            };
            self.cache.set_validation(url, &verdict).await;
            return verdict;
        }

        ValidationVerdict {
            is_hotel: false,
            confidence: 0.0,
            indicators: vec!["Fetch error".to_string()],
        }
    }
}
