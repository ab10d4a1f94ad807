// src/matching/name.rs - Organization name and geography normalization
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Legal-entity designators stripped from the end of a name. The last few
/// are abbreviated spellings that show up in government filings.
pub const LEGAL_SUFFIXES: &[&str] = &[
    "LLC", "INC", "INCORPORATED", "CORP", "CORPORATION", "COMPANY", "CO", "LTD", "LIMITED", "LP",
    "LLP", "PC", "PA", "PLLC", "GROUP", "HOLDINGS", "SERVICES", "ENTERPRISES", "ASSOCIATES",
    "INTERNATIONAL", "GRP", "HLDGS", "SVCS", "ASSOC", "INTL",
];

const LEADING_ARTICLE: &str = "THE";

static SUFFIX_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| LEGAL_SUFFIXES.iter().copied().collect());

// Deleted outright so "L.L.C." collapses to "LLC" and "O'Brien" to "OBRIEN".
static ELIDED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.'\u{2019}`]").unwrap());

// Combining marks stay attached to their letter; uppercasing can split a
// precomposed letter into base plus mark.
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{M}\p{N}]+").unwrap());

pub fn is_legal_suffix(token: &str) -> bool {
    SUFFIX_SET.contains(token)
}

/// Uppercases, deletes elided punctuation and turns every other run of
/// non-alphanumeric characters into a single separator.
fn tokenize(raw: &str) -> Vec<String> {
    let upper = raw.to_uppercase();
    let elided = ELIDED_CHARS.replace_all(&upper, "");
    let with_and = elided.replace('&', " AND ");
    NON_ALNUM
        .replace_all(&with_and, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Canonical comparable form of an organization name.
///
/// Total and pure: degenerate input such as `"LLC"` yields an empty string
/// rather than an error. Applying it twice gives the same result as once.
pub fn normalize(raw_name: &str) -> String {
    let mut tokens = tokenize(raw_name);

    let leading_articles = tokens
        .iter()
        .take(tokens.len().saturating_sub(1))
        .take_while(|t| t.as_str() == LEADING_ARTICLE)
        .count();
    tokens.drain(..leading_articles);

    while tokens.last().is_some_and(|t| is_legal_suffix(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

/// Tokens of a normalized name that carry meaning for overlap scoring.
pub fn significant_tokens(normalized_name: &str) -> HashSet<&str> {
    normalized_name
        .split_whitespace()
        .filter(|t| !is_legal_suffix(t))
        .collect()
}

pub fn first_word(normalized_name: &str) -> Option<&str> {
    normalized_name.split_whitespace().next()
}

/// Normalizes a city or state value; `None` when nothing comparable remains.
pub fn normalize_place(raw: &str) -> Option<String> {
    let joined = tokenize(raw).join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// US ZIP codes compare on their first five digits; anything else is kept
/// as compact uppercase alphanumerics.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let compact: String = tokenize(raw).concat();
    if compact.is_empty() {
        return None;
    }
    let leading_digits = compact.chars().take_while(|c| c.is_ascii_digit()).count();
    if leading_digits >= 5 {
        Some(compact[..5].to_string())
    } else {
        Some(compact)
    }
}
