use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing "type" suffixes stripped from a facility name. Only the first
/// trailing match is removed and remembered for a high-priority variant.
const TYPE_SUFFIXES: [&str; 14] = [
    "otel",
    "oteli",
    "pansiyon",
    "pansiyonu",
    "hotel",
    "hotels",
    "motel",
    "apart",
    "apart otel",
    "spa",
    "tesisi",
    "pension",
    "guest house",
    "hostel",
];

const STOPWORDS: [&str; 17] = [
    "the", "a", "an", "and", "or", "in", "at", "by", "for", "of", "to", "is", "special", "class",
    "boutique", "luxury", "deluxe",
];

/// Words that say WHAT a facility is rather than which one it is.
const TYPE_WORDS: [&str; 20] = [
    "hotel",
    "otel",
    "resort",
    "spa",
    "apart",
    "pansiyon",
    "motel",
    "house",
    "guest",
    "inn",
    "lodge",
    "oteli",
    "oteller",
    "pansiyonu",
    "resorts",
    "kabin",
    "kabins",
    "vila",
    "villalar",
    "konaklama",
];

/// TLD ladder for guessed domains, most specific first.
pub const TLDS: [&str; 10] = [
    ".com.tr", ".org.tr", ".net.tr", ".biz.tr", ".com", ".net", ".org", ".biz", ".info", ".co",
];

/// Retried in strategy C after the main ladder is exhausted.
pub const ALTERNATIVE_TLDS: [&str; 3] = [".biz", ".info", ".mobi"];

static BRACKETS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)|\[.*?\]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s+").unwrap());
static CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\sşğıüçöŞĞİÜÇÖ-]").unwrap());

/// Fold Turkish diacritics to ASCII. Input is expected lowercased; the
/// combining dot left behind by lowercasing 'İ' is dropped as well.
pub fn fold_diacritics(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            'ş' => Some('s'),
            'ı' => Some('i'),
            'ğ' => Some('g'),
            'ü' => Some('u'),
            'ç' => Some('c'),
            'ö' => Some('o'),
            'Ş' => Some('S'),
            'Ğ' => Some('G'),
            'Ü' => Some('U'),
            'Ç' => Some('C'),
            'Ö' => Some('O'),
            'İ' => Some('I'),
            '\u{0307}' => None,
            _ => Some(c),
        })
        .collect()
}

fn is_type_word(token: &str) -> bool {
    TYPE_WORDS.contains(&fold_diacritics(token).as_str())
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Stage 1: substring before '-', brackets stripped, whitespace collapsed.
pub fn pre_clean(name: &str) -> String {
    let base = match name.split_once('-') {
        Some((before, _)) => before.trim(),
        None => name.trim(),
    };
    let base = BRACKETS_RE.replace_all(base, "");
    WHITESPACE_RE.replace_all(base.trim(), " ").to_string()
}

/// Stage 2: strip the first matching trailing type suffix, checked against
/// a diacritic-folded shadow of the name.
pub fn strip_type_suffix(name: &str) -> (String, Option<&'static str>) {
    let shadow = fold_diacritics(&name.to_lowercase());

    for suffix in TYPE_SUFFIXES {
        if shadow.ends_with(&format!(" {suffix}")) {
            let keep = name.chars().count() - suffix.chars().count() - 1;
            let stripped: String = name.chars().take(keep).collect();
            return (stripped.trim().to_string(), Some(suffix));
        }
    }

    (name.to_string(), None)
}

fn scrub_variant(tokens: &[String], joiner: &str) -> String {
    let joined = tokens.join(joiner);
    let folded = fold_diacritics(&joined);
    folded
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '.' | ',' | '/'))
        .collect()
}

/// Normalized view of a facility name, ready for domain guessing.
#[derive(Debug, Clone)]
pub struct NormalizedName {
    /// Pre-cleaned name (before lowercase folding).
    pub base: String,
    /// Lowercased, suffix-stripped, charset-filtered form with spaces kept.
    pub clean_name: String,
    /// Fully folded, concatenated form; the strategy-C base.
    pub clean_concat: String,
    pub removed_suffix: Option<&'static str>,
    /// Priority-ordered domain label candidates.
    pub domain_variants: Vec<String>,
}

/// Run the full normalization pipeline over a raw facility name.
pub fn normalize(name: &str) -> NormalizedName {
    let base = pre_clean(name);
    let mut clean_name = base.to_lowercase();

    // keep the original token list for numeric variants before the
    // numeric prefix is dropped
    let raw_name = clean_name.clone();
    clean_name = NUMERIC_PREFIX_RE.replace(&clean_name, "").to_string();

    clean_name = clean_name.replace('&', "");
    clean_name = CHARSET_RE.replace_all(&clean_name, "").to_string();
    clean_name = WHITESPACE_RE.replace_all(clean_name.trim(), " ").to_string();

    let (clean_name, removed_suffix) = strip_type_suffix(&clean_name);

    let raw_tokens_original: Vec<String> =
        raw_name.split_whitespace().map(|t| t.to_string()).collect();
    let raw_tokens: Vec<String> = clean_name
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();

    let mut core_tokens: Vec<String> = raw_tokens
        .iter()
        .filter(|t| !is_stopword(t) && !is_type_word(t))
        .cloned()
        .collect();
    if core_tokens.is_empty() {
        core_tokens = raw_tokens
            .iter()
            .filter(|t| !is_stopword(t))
            .cloned()
            .collect();
    }

    // progressive prefixes: core first, then the raw combinations the core
    // filter collapsed away (catches patterns like "alexiaresort")
    let mut progressive: Vec<Vec<String>> = Vec::new();
    if !core_tokens.is_empty() {
        for i in 1..=core_tokens.len() {
            progressive.push(core_tokens[..i].to_vec());
        }
    } else {
        for i in 1..=raw_tokens.len() {
            progressive.push(raw_tokens[..i].to_vec());
        }
    }
    if core_tokens.len() < raw_tokens.len() && raw_tokens.len() > 1 {
        for i in (core_tokens.len() + 1)..=raw_tokens.len() {
            let combo = raw_tokens[..i].to_vec();
            if !progressive.contains(&combo) {
                progressive.push(combo);
            }
        }
    }

    // a stripped suffix gets re-attached to the core as the top candidate;
    // Turkish possessive suffixes also yield their bare form
    if let Some(suffix) = removed_suffix {
        if !core_tokens.is_empty() {
            let mut with_suffix = core_tokens.clone();
            with_suffix.push(suffix.to_string());
            let bare = match suffix {
                "oteli" => Some("otel"),
                "pansiyonu" => Some("pansiyon"),
                _ => None,
            };
            if let Some(bare) = bare {
                let mut with_bare = core_tokens.clone();
                with_bare.push(bare.to_string());
                if !progressive.contains(&with_bare) {
                    progressive.insert(0, with_bare);
                }
            }
            if !progressive.contains(&with_suffix) {
                progressive.insert(0, with_suffix);
            }
        }
    }

    let mut domain_variants: Vec<String> = Vec::new();
    let mut push_variant = |v: String, out: &mut Vec<String>| {
        if v.chars().count() >= 3 && !out.contains(&v) {
            out.push(v);
        }
    };

    for token_list in &progressive {
        if token_list.is_empty() {
            continue;
        }
        let has_type = token_list.iter().any(|t| is_type_word(t));

        let mut orderings: Vec<Vec<String>> = Vec::new();
        if has_type {
            orderings.push(token_list.clone());
        } else {
            let mut hotel_first = vec!["hotel".to_string()];
            hotel_first.extend(token_list.iter().cloned());
            orderings.push(hotel_first);

            let mut hotel_last = token_list.clone();
            hotel_last.push("hotel".to_string());
            orderings.push(hotel_last);

            if token_list.len() >= 2 {
                let mut hotel_mid = vec![token_list[0].clone(), "hotel".to_string()];
                hotel_mid.extend(token_list[1..].iter().cloned());
                orderings.push(hotel_mid);
            }
        }

        for ordering in orderings {
            push_variant(scrub_variant(&ordering, ""), &mut domain_variants);
            push_variant(scrub_variant(&ordering, "-"), &mut domain_variants);
        }
    }

    // numeric variants from the original tokens (before prefix strip)
    for token in &raw_tokens_original {
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            push_variant(format!("hotel{token}"), &mut domain_variants);
            push_variant(format!("{token}hotel"), &mut domain_variants);
        }
    }

    let clean_concat = scrub_variant(
        &clean_name
            .split_whitespace()
            .map(|t| t.to_string())
            .collect::<Vec<_>>(),
        "",
    );
    push_variant(clean_concat.clone(), &mut domain_variants);

    NormalizedName {
        base,
        clean_name,
        clean_concat,
        removed_suffix,
        domain_variants: prioritize_variants(domain_variants),
    }
}

/// Stage 8: bucket variants by specificity, longest first within a bucket.
/// Turkish "oteli"/"otel" endings outrank everything; a generic "hotel"
/// filler drops a variant to the last bucket.
fn prioritize_variants(variants: Vec<String>) -> Vec<String> {
    let mut has_oteli = Vec::new();
    let mut has_otel = Vec::new();
    let mut no_hotel = Vec::new();
    let mut has_hotel = Vec::new();

    for v in variants {
        if v.ends_with("oteli") {
            has_oteli.push(v);
        } else if v.ends_with("otel") && !v.contains("hotel") {
            has_otel.push(v);
        } else if !v.contains("hotel") {
            no_hotel.push(v);
        } else {
            has_hotel.push(v);
        }
    }

    for bucket in [&mut has_oteli, &mut has_otel, &mut no_hotel, &mut has_hotel] {
        bucket.sort_by_key(|v| std::cmp::Reverse(v.chars().count()));
    }

    has_oteli
        .into_iter()
        .chain(has_otel)
        .chain(no_hotel)
        .chain(has_hotel)
        .collect()
}

/// Stage 9: expand domain labels across the TLD ladder, with and without
/// the `www.` host prefix. Order follows variant priority, then TLD order.
pub fn url_candidates(variants: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for variant in variants {
        for tld in TLDS {
            for prefix in ["http://www.", "http://"] {
                let url = format!("{prefix}{variant}{tld}");
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
    }
    urls
}

const QUERY_TYPE_WORDS: [&str; 12] = [
    "hotel", "otel", "resort", "spa", "apart", "pansiyon", "motel", "pension", "guest", "house",
    "hostel", "inn",
];

/// Progressively longer search queries: highest-relevance tokens first,
/// widened token by token, quoted and unquoted, with the city and with the
/// raw-name suffix when the name carried one.
pub fn progressive_queries(name: &str, city: &str) -> Vec<String> {
    let lowered = name.to_lowercase();
    let mut parts = lowered.splitn(2, '-');
    let base = parts.next().unwrap_or("").trim().to_string();
    let suffix = parts.next().unwrap_or("").trim().to_string();

    let tokens: Vec<String> = base.split_whitespace().map(|t| t.to_string()).collect();
    let suffix_tokens: Vec<String> = suffix.split_whitespace().map(|t| t.to_string()).collect();

    let is_query_type = |t: &str| QUERY_TYPE_WORDS.contains(&fold_diacritics(t).as_str());

    let mut core: Vec<String> = tokens
        .iter()
        .filter(|t| !is_stopword(t) && !is_query_type(t))
        .cloned()
        .collect();
    if core.is_empty() {
        core = tokens.iter().filter(|t| !is_stopword(t)).cloned().collect();
    }

    let mut progressive: Vec<Vec<String>> = Vec::new();
    let start = if core.len() >= 2 { 2 } else { 1 };
    for i in start..=core.len() {
        progressive.push(core[..i].to_vec());
    }

    let core_no_numbers: Vec<String> = core
        .iter()
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .cloned()
        .collect();
    if !core_no_numbers.is_empty() && core_no_numbers != core {
        let start = if core_no_numbers.len() >= 2 { 2 } else { 1 };
        for i in start..=core_no_numbers.len() {
            progressive.push(core_no_numbers[..i].to_vec());
        }
    }

    if !tokens.is_empty() {
        progressive.push(tokens.clone());
    }

    let location_hint = suffix_tokens.join(" ");
    let mut queries: Vec<String> = Vec::new();
    let mut push_query = |q: String, out: &mut Vec<String>| {
        if !out.contains(&q) {
            out.push(q);
        }
    };

    for token_list in progressive {
        if token_list.is_empty() {
            continue;
        }
        let mut token_list = token_list;
        if !token_list.iter().any(|t| is_query_type(t)) {
            token_list.push("hotel".to_string());
        }
        let phrase = token_list.join(" ");
        if phrase.chars().count() < 3 {
            continue;
        }

        push_query(format!("\"{phrase}\" {city} otel"), &mut queries);
        push_query(format!("{phrase} {city} otel"), &mut queries);

        if !location_hint.is_empty() {
            push_query(format!("\"{phrase}\" {location_hint} otel"), &mut queries);
            push_query(format!("{phrase} {location_hint} otel"), &mut queries);
        }

        if !suffix_tokens.is_empty() {
            let mut with_suffix = token_list.clone();
            with_suffix.extend(suffix_tokens.iter().cloned());
            let phrase = with_suffix.join(" ");
            if phrase.chars().count() >= 3 {
                push_query(format!("\"{phrase}\" {city} otel"), &mut queries);
                push_query(format!("{phrase} {city} otel"), &mut queries);
            }
        }
    }

    queries
}
