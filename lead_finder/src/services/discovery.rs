use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::services::normalizer::{
    self, fold_diacritics, progressive_queries, url_candidates, ALTERNATIVE_TLDS,
};
use crate::services::http_probe::ProbeOutcome;
use crate::services::Services;
use crate::types::{DiscoveryOutcome, FoundWebsite, ReasonCode, WebsiteSource};

/// OTA, metasearch and social domains that can never be a facility's own
/// site.
const BLACKLIST_DOMAINS: [&str; 30] = [
    "booking.com",
    "tripadvisor",
    "trivago",
    "etstur.com",
    "hotels.com",
    "expedia",
    "tatilbudur.com",
    "agoda.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "linkedin.com",
    "youtube.com",
    "google.com",
    "wikipedia",
    "enuygun.com",
    "obilet.com",
    "skyscanner.com",
    "skyscanner.com.tr",
    "hotel-istanbul.net",
    "hotel-of-istanbul.com",
    "hotel-tr.com",
    "otelz.com",
    "otelz.com.tr",
    "jollytur.com",
    "tatilsepeti.com",
    "setur.com.tr",
    "neredekal.com",
    "gezimanya.com",
    "trip.com",
];

const RELEVANCE_KEYWORDS: [&str; 15] = [
    "hotel", "hotels", "otel", "oteller", "resort", "spa", "apart", "pansiyon", "motel",
    "pension", "guest", "house", "hostel", "lodge", "inn",
];

const SCORE_STOPWORDS: [&str; 12] = [
    "the", "a", "an", "and", "or", "in", "at", "by", "for", "of", "to", "is",
];

const SCORE_HOTEL_KEYWORDS: [&str; 10] = [
    "hotel", "otel", "resort", "apart", "pansiyon", "villa", "lodge", "inn", "motel", "pension",
];

/// Two-level public suffixes the label extractor knows about.
const SECOND_LEVEL_SUFFIXES: [&str; 10] = [
    "com.tr", "org.tr", "net.tr", "biz.tr", "gen.tr", "av.tr", "gov.tr", "edu.tr", "co.uk",
    "com.au",
];

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const HIGH_CONFIDENCE_SCORE: f64 = 85.0;
const SEARCH_CANDIDATE_MIN_SCORE: f64 = 10.0;

/// Registrable label and full registrable domain of a URL:
/// `http://www.pearlhotel.com.tr/x` -> ("pearlhotel", "pearlhotel.com.tr").
pub fn domain_parts(url: &str) -> (String, String) {
    let host = url
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split(['/', '?'])
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .trim_start_matches("www.")
        .to_lowercase();

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return (host.clone(), host);
    }

    let last_two = parts[parts.len() - 2..].join(".");
    if SECOND_LEVEL_SUFFIXES.contains(&last_two.as_str()) && parts.len() >= 3 {
        let label = parts[parts.len() - 3].to_string();
        (label.clone(), format!("{label}.{last_two}"))
    } else {
        let label = parts[parts.len() - 2].to_string();
        (label.clone(), last_two)
    }
}

pub fn is_blacklisted(url: &str) -> bool {
    let (label, full) = domain_parts(url);
    BLACKLIST_DOMAINS.contains(&label.as_str()) || BLACKLIST_DOMAINS.contains(&full.as_str())
}

/// Less restrictive relevance gate: hotel-looking or name-bearing domains
/// get a chance, validation decides the rest.
pub fn is_relevant_domain(hotel_name: &str, url: &str) -> bool {
    if is_blacklisted(url) {
        return false;
    }

    let (label, _) = domain_parts(url);
    if label.is_empty() {
        return false;
    }

    // a bare generic type word is never somebody's domain
    if RELEVANCE_KEYWORDS.contains(&label.as_str()) && label.chars().count() < 6 {
        return false;
    }

    if RELEVANCE_KEYWORDS.iter().any(|kw| label.contains(kw)) {
        return true;
    }

    let name = hotel_name.to_lowercase();
    for token in name.split_whitespace() {
        if token.chars().count() <= 2
            || SCORE_STOPWORDS.contains(&token)
            || RELEVANCE_KEYWORDS.contains(&token)
        {
            continue;
        }
        let token_clean = DIGITS_RE.replace_all(token, "");
        if token_clean.chars().count() >= 3 && label.contains(token_clean.as_ref()) {
            return true;
        }
    }

    label.chars().count() >= 6
}

/// 0-100 match score between a facility name and a found URL: token
/// overlap with the domain label (digit-stripped and 4-char-prefix partial
/// matches included), a hotel keyword in the domain, the name in the page
/// title, and a length bonus for specific-looking domains.
pub fn calculate_score(hotel_name: &str, found_url: &str, title: &str) -> f64 {
    let mut score = 0.0;

    let name = hotel_name.to_lowercase();
    let mut name_tokens: Vec<String> = name
        .split_whitespace()
        .filter(|t| t.chars().count() > 2 && !SCORE_STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect();
    if name_tokens.is_empty() {
        name_tokens = name.split_whitespace().map(|t| t.to_string()).collect();
    }
    name_tokens.dedup();

    let (domain_name, _) = domain_parts(found_url);
    let domain_clean = DIGITS_RE.replace_all(&domain_name, "").to_string();

    let mut matches = 0.0;
    for token in &name_tokens {
        let token_clean = DIGITS_RE.replace_all(token, "").to_string();

        if domain_name.contains(token.as_str()) || domain_name.contains(&token_clean) {
            matches += 1.0;
        } else if !token_clean.is_empty() && domain_clean.contains(&token_clean) {
            matches += 1.0;
        } else if token_clean.chars().count() >= 4 {
            let prefix: String = token_clean.chars().take(4).collect();
            let domain_prefix: String = domain_clean.chars().take(4).collect();
            if domain_clean.starts_with(&prefix) || token_clean.starts_with(&domain_prefix) {
                matches += 0.5;
            }
        }
    }
    if !name_tokens.is_empty() {
        score += (matches / name_tokens.len() as f64) * 45.0;
    }

    if SCORE_HOTEL_KEYWORDS.iter().any(|kw| domain_name.contains(kw)) {
        score += 20.0;
    }

    if !title.is_empty() {
        let title = title.to_lowercase();
        if title.contains(&name) {
            score += 30.0;
        } else {
            let in_title = name_tokens
                .iter()
                .filter(|t| t.chars().count() > 3 && title.contains(t.as_str()))
                .count();
            if in_title > 0 {
                score += (in_title as f64 * 10.0).min(25.0);
            }
        }
    }

    let domain_len = domain_name.chars().count();
    if domain_len > 8 {
        score += 10.0;
    } else if domain_len > 5 {
        score += 5.0;
    }

    score.min(100.0)
}

/// Bonus for domain substrings that also appear in the facility name;
/// makes "alexiaresort" beat "alexia-hotel" when both validate.
fn domain_quality_bonus(candidate_url: &str, hotel_name: &str) -> f64 {
    let url = candidate_url.to_lowercase();
    let name = hotel_name.to_lowercase();
    let mut bonus = 0.0;

    if url.contains("resort") && name.contains("resort") {
        bonus += 10.0;
    }
    if url.contains("otel") && fold_diacritics(&name).contains("otel") {
        bonus += 15.0;
    }
    if ["spa", "beach", "villa"]
        .iter()
        .any(|kw| url.contains(kw) && name.contains(kw))
    {
        bonus += 8.0;
    }

    bonus
}

#[derive(Default)]
struct NegativeTrace {
    domain_checked: bool,
    domain_relevant: bool,
    domain_valid: bool,
    ddg_candidates: bool,
    ddg_relevant: bool,
    ddg_valid: bool,
    alt_checked: bool,
    alt_relevant: bool,
    alt_valid: bool,
}

/// Find a facility's website: guessed domains first, then the search
/// fallback, then alternative TLDs. Returns a scored match or the most
/// specific negative reason reached.
pub async fn find_website(services: &Services, hotel_name: &str, city: &str) -> DiscoveryOutcome {
    let hotel_name = hotel_name.trim();
    let city = city.trim().to_lowercase();

    if hotel_name.is_empty() {
        return DiscoveryOutcome::NotFound {
            reason: ReasonCode::NoMatch,
        };
    }

    info!("[DISCOVERY] searching: {} ({})", hotel_name, city);

    let mut trace = NegativeTrace::default();
    let mut reason: Option<ReasonCode> = None;

    let normalized = normalizer::normalize(hotel_name);

    // Strategy A: domain guessing over DNS-filtered candidates
    if normalized.clean_concat.chars().count() >= 3 {
        if let Some(found) =
            domain_guess_strategy(services, hotel_name, &city, &normalized, &mut trace).await
        {
            return DiscoveryOutcome::Found(found);
        }
    } else {
        debug!(
            "[DISCOVERY] cleaned name too short: {}",
            normalized.clean_concat
        );
    }

    if trace.domain_checked && !trace.domain_valid {
        reason = Some(if trace.domain_relevant {
            ReasonCode::DomainNotHotel
        } else {
            ReasonCode::DomainNotRelevant
        });
    }

    // Strategy B: progressive search queries, skipped while the breaker is
    // open
    if let Some(found) = search_strategy(services, hotel_name, &city, &mut trace).await {
        return DiscoveryOutcome::Found(found);
    }

    if reason.is_none() {
        if trace.ddg_candidates && !trace.ddg_valid {
            reason = Some(if trace.ddg_relevant {
                ReasonCode::DdgNoValid
            } else {
                ReasonCode::DdgNotRelevant
            });
        } else if !trace.ddg_candidates {
            reason = Some(ReasonCode::DdgNoCandidates);
        }
    }

    // Strategy C: alternative TLDs on the cleaned base name
    if let Some(found) =
        alternative_tld_strategy(services, hotel_name, &city, &normalized.clean_concat, &mut trace)
            .await
    {
        return DiscoveryOutcome::Found(found);
    }

    if trace.alt_checked && !trace.alt_valid && reason.is_none() {
        reason = Some(if trace.alt_relevant {
            ReasonCode::AlternativeNotHotel
        } else {
            ReasonCode::AlternativeNotRelevant
        });
    }

    warn!("[DISCOVERY] not found: {}", hotel_name);
    DiscoveryOutcome::NotFound {
        reason: reason.unwrap_or(ReasonCode::NoMatch),
    }
}

async fn domain_guess_strategy(
    services: &Services,
    hotel_name: &str,
    city: &str,
    normalized: &normalizer::NormalizedName,
    trace: &mut NegativeTrace,
) -> Option<FoundWebsite> {
    let candidates = url_candidates(&normalized.domain_variants);
    info!(
        "[DISCOVERY] DNS pre-check for {} candidate URLs",
        candidates.len()
    );
    let candidates = services.dns.filter(candidates).await;

    let mut best: Option<FoundWebsite> = None;

    for candidate in candidates {
        trace.domain_checked = true;

        let ProbeOutcome::Reachable { final_url, .. } = services.probe.head(&candidate).await
        else {
            continue;
        };

        if !is_relevant_domain(hotel_name, &final_url) {
            debug!("[DISCOVERY] domain not relevant: {}", final_url);
            continue;
        }
        trace.domain_relevant = true;

        let validation = services
            .validator
            .validate(&services.probe, &final_url, hotel_name, city)
            .await;
        if !validation.is_hotel {
            debug!(
                "[DISCOVERY] domain exists but is not a hotel: {} (conf: {:.0})",
                final_url, validation.confidence
            );
            continue;
        }

        let mut score = calculate_score(hotel_name, &final_url, hotel_name);
        score = (score + validation.confidence / 2.0).min(100.0);
        score = (score + domain_quality_bonus(&candidate, hotel_name)).min(100.0);

        info!(
            "[DISCOVERY] validated domain: {} (score: {:.1})",
            final_url, score
        );
        trace.domain_valid = true;

        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(FoundWebsite {
                url: final_url,
                score,
                source: WebsiteSource::DomainGuess,
                indicators: validation.indicators,
            });
        }

        if score >= HIGH_CONFIDENCE_SCORE {
            info!("[DISCOVERY] high-confidence match, returning early");
            return best;
        }
    }

    if let Some(best) = &best {
        info!(
            "[DISCOVERY] returning best domain guess: {} (score: {:.1})",
            best.url, best.score
        );
    }
    best
}

async fn search_strategy(
    services: &Services,
    hotel_name: &str,
    city: &str,
    trace: &mut NegativeTrace,
) -> Option<FoundWebsite> {
    if services.search.is_open() {
        warn!("[DISCOVERY] search circuit is open, skipping search strategy");
        return None;
    }

    for query in progressive_queries(hotel_name, city) {
        debug!("[DISCOVERY] search query: {}", query);

        // outbound jitter keeps the endpoint from rate-limiting us
        let jitter = rand::random_range(0.5..1.5);
        tokio::time::sleep(Duration::from_secs_f64(jitter)).await;

        let hits = match services.search.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("[DISCOVERY] search failed: {:?}", e);
                return None;
            }
        };

        let mut candidates: Vec<(String, f64)> = Vec::new();
        for hit in hits {
            if is_blacklisted(&hit.url) {
                debug!("[DISCOVERY] blacklisted: {}", hit.url);
                continue;
            }
            let score = calculate_score(hotel_name, &hit.url, &hit.title);
            if score > SEARCH_CANDIDATE_MIN_SCORE {
                debug!("[DISCOVERY] candidate: {} (score: {:.1})", hit.url, score);
                candidates.push((hit.url, score));
            }
        }

        if candidates.is_empty() {
            debug!("[DISCOVERY] no search candidates for query: {}", query);
            continue;
        }

        trace.ddg_candidates = true;
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (url, score) in candidates {
            if !is_relevant_domain(hotel_name, &url) {
                continue;
            }
            trace.ddg_relevant = true;

            let validation = services
                .validator
                .validate(&services.probe, &url, hotel_name, city)
                .await;
            if validation.is_hotel {
                let final_score = (score + validation.confidence / 2.0).min(100.0);
                info!(
                    "[DISCOVERY] search result validated: {} (score: {:.1})",
                    url, final_score
                );
                trace.ddg_valid = true;
                return Some(FoundWebsite {
                    url,
                    score: final_score,
                    source: WebsiteSource::DdgSearch,
                    indicators: validation.indicators,
                });
            }
        }

        warn!("[DISCOVERY] search candidates found but none validate as hotels");
    }

    None
}

async fn alternative_tld_strategy(
    services: &Services,
    hotel_name: &str,
    city: &str,
    clean_name: &str,
    trace: &mut NegativeTrace,
) -> Option<FoundWebsite> {
    let clean_name = clean_name.trim();
    if clean_name.chars().count() < 2 {
        return None;
    }

    info!("[DISCOVERY] trying alternative TLD patterns");

    for tld in ALTERNATIVE_TLDS {
        let candidate = format!("http://{clean_name}{tld}");
        trace.alt_checked = true;

        let ProbeOutcome::Reachable { final_url, .. } = services.probe.head(&candidate).await
        else {
            continue;
        };

        if !is_relevant_domain(hotel_name, &final_url) {
            continue;
        }
        trace.alt_relevant = true;

        let validation = services
            .validator
            .validate(&services.probe, &final_url, hotel_name, city)
            .await;
        if validation.is_hotel {
            let score =
                (calculate_score(hotel_name, &final_url, hotel_name) + validation.confidence / 2.0)
                    .min(100.0);
            info!(
                "[DISCOVERY] validated alternative: {} (score: {:.1})",
                final_url, score
            );
            trace.alt_valid = true;
            return Some(FoundWebsite {
                url: final_url,
                score,
                source: WebsiteSource::AlternativeTld,
                indicators: validation.indicators,
            });
        }

        debug!(
            "[DISCOVERY] alternative domain exists but is not a hotel: {}",
            final_url
        );
    }

    None
}
