use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

/// Obfuscation patterns with (local, domain, tld) capture groups.
static OBFUSCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // [at] / [dot] and the paren/brace variants
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s*\[\s*at\s*\]\s*([a-zA-Z0-9.-]+)\s*\[\s*dot\s*\]\s*([a-zA-Z]{2,})").unwrap(),
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s*\(\s*at\s*\)\s*([a-zA-Z0-9.-]+)\s*\(\s*dot\s*\)\s*([a-zA-Z]{2,})").unwrap(),
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s*\{\s*at\s*\}\s*([a-zA-Z0-9.-]+)\s*\{\s*dot\s*\}\s*([a-zA-Z]{2,})").unwrap(),
        // AT and DOT written out
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s+at\s+([a-zA-Z0-9.-]+)\s+dot\s+([a-zA-Z]{2,})").unwrap(),
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s+AT\s+([a-zA-Z0-9.-]+)\s+DOT\s+([a-zA-Z]{2,})").unwrap(),
        // Turkish variants
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s*\[\s*et\s*\]\s*([a-zA-Z0-9.-]+)\s*\[\s*nokta\s*\]\s*([a-zA-Z]{2,})").unwrap(),
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)\s+et\s+([a-zA-Z0-9.-]+)\s+nokta\s+([a-zA-Z]{2,})").unwrap(),
        // HTML entity variants (&#64; = @, &#46; = .)
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)&#64;([a-zA-Z0-9.-]+)&#46;([a-zA-Z]{2,})").unwrap(),
        Regex::new(r"(?i)([a-zA-Z0-9._%+-]+)&commat;([a-zA-Z0-9.-]+)&period;([a-zA-Z]{2,})").unwrap(),
    ]
});

// i n f o @ ... -> info@ ...
static SPACED_LOCAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9])\s+([a-zA-Z0-9])\s+([a-zA-Z0-9])\s+([a-zA-Z0-9])\s*@").unwrap()
});

static INVALID_EMAIL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // asset paths picked up by the loose regex
        r".*\.png$", r".*\.jpg$", r".*\.gif$", r".*\.jpeg$",
        r".*\.js$", r".*\.css$",
        // placeholder domains
        r".*@example\.com$", r".*@test\.com$",
        r"^noreply@", r"^no-reply@",
        // service senders
        r".*@sentry\.io$", r".*@google\.com$",
        // numeric usernames are usually tracking artifacts
        r"^[0-9]+@",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Preferred business mailbox names. An exact local-part match is worth
/// more than a substring one.
pub const PREFERRED_PREFIXES: [&str; 9] = [
    "info",
    "contact",
    "rezervasyon",
    "reservation",
    "booking",
    "sales",
    "satis",
    "reception",
    "resepsiyon",
];

const GENERIC_PROVIDERS: [&str; 5] = [
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "yandex.com",
];

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim().to_lowercase();

    if INVALID_EMAIL_PATTERNS.iter().any(|p| p.is_match(&email)) {
        return false;
    }

    let len = email.chars().count();
    if !(5..=254).contains(&len) {
        return false;
    }

    if email.matches('@').count() != 1 {
        return false;
    }

    let domain = email.split('@').nth(1).unwrap_or("");
    domain.contains('.')
}

/// Rebuild addresses hidden behind common anti-scraping spellings.
pub fn decode_obfuscated_emails(text: &str) -> HashSet<String> {
    let mut emails = HashSet::new();

    for pattern in OBFUSCATION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let email = format!("{}@{}.{}", &caps[1], &caps[2], &caps[3])
                .trim()
                .to_lowercase();
            if is_valid_email(&email) {
                emails.insert(email);
            }
        }
    }

    emails
}

/// All valid addresses in a text blob, standard and obfuscated.
pub fn extract_emails_from_text(text: &str) -> HashSet<String> {
    // collapse spaced-out locals so the standard regex can see them
    let despaced = SPACED_LOCAL_RE.replace_all(text, "$1$2$3$4@");

    let mut emails: HashSet<String> = EMAIL_RE
        .find_iter(&despaced)
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|e| is_valid_email(e))
        .collect();

    emails.extend(decode_obfuscated_emails(text));
    emails
}

static MAILTO_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static DATA_EMAIL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-email]").unwrap());
static DATA_MAIL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-mail]").unwrap());
static META_EMAIL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="email"]"#).unwrap());
static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Recover addresses from an HTML document: visible text, `mailto:`
/// anchors, `data-email`/`data-mail` attributes, an email meta tag, and
/// JSON-LD `email` fields.
pub fn extract_emails_from_html(html: &str) -> HashSet<String> {
    let doc = Html::parse_document(html);
    let mut emails = HashSet::new();

    let visible: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
    emails.extend(extract_emails_from_text(&visible));

    for anchor in doc.select(&MAILTO_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(target) = href.strip_prefix("mailto:") {
            let email = target.split('?').next().unwrap_or("").trim().to_lowercase();
            if is_valid_email(&email) {
                emails.insert(email);
            }
        }
    }

    for (selector, attr) in [(&DATA_EMAIL_SELECTOR, "data-email"), (&DATA_MAIL_SELECTOR, "data-mail")] {
        for element in doc.select(selector) {
            if let Some(value) = element.value().attr(attr) {
                let email = value.trim().to_lowercase();
                if is_valid_email(&email) {
                    emails.insert(email);
                }
            }
        }
    }

    for meta in doc.select(&META_EMAIL_SELECTOR) {
        if let Some(content) = meta.value().attr("content") {
            let email = content.trim().to_lowercase();
            if is_valid_email(&email) {
                emails.insert(email);
            }
        }
    }

    for script in doc.select(&JSON_LD_SELECTOR) {
        let raw: String = script.text().collect();
        if let Ok(serde_json::Value::Object(data)) = serde_json::from_str(&raw) {
            if let Some(serde_json::Value::String(email)) = data.get("email") {
                let email = email.trim().to_lowercase();
                if is_valid_email(&email) {
                    emails.insert(email);
                }
            }
        }
    }

    emails
}

/// Score an address against the site it was found on. Scores are raw and
/// may go negative; higher is better.
pub fn score_email(email: &str, site_host: &str) -> i32 {
    let mut score = 0;
    let email = email.to_lowercase();

    let email_domain = email.split('@').nth(1).unwrap_or("");
    let website_domain = site_host.trim_start_matches("www.");

    if email_domain == website_domain {
        score += 50;
    } else if website_domain.contains(email_domain) || email_domain.contains(website_domain) {
        score += 30;
    }

    let local = email.split('@').next().unwrap_or("");
    if PREFERRED_PREFIXES.contains(&local) {
        score += 40;
    } else if PREFERRED_PREFIXES.iter().any(|p| local.contains(p)) {
        score += 20;
    }

    if GENERIC_PROVIDERS.contains(&email_domain) {
        score -= 20;
    }

    score
}
