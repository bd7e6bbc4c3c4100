use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Requisition ids appended to slugs: `_R12345`, `_JR-0012`, `_P2`, `-123456`
static REQUISITION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:_[A-Z]{1,4}-?\d+(?:[-_]\d+)?|-\d{5,})$").unwrap());

/// Trims the text and collapses every run of whitespace into a single space.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Same as [`clean_text`], but for values that might be missing entirely.
pub fn clean_opt(text: Option<&str>) -> String {
    text.map(clean_text).unwrap_or_default()
}

/// Keeps the first occurrence of every item, in the original order.
pub fn dedup_preserving_order<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Derives a readable job title from the last segment of a posting URL or path.
///
/// `/job/Seattle-WA/Senior-Software-Engineer_R12345` becomes
/// `Senior Software Engineer`. All-lowercase slugs get their words capitalized.
pub fn title_from_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let segment = percent_decode(segment);
    let segment = REQUISITION_SUFFIX.replace(&segment, "");

    let words = segment.replace(['-', '_', '+'], " ");
    let words = clean_text(&words);
    if !words.chars().any(char::is_alphabetic) {
        return None;
    }

    if words.chars().any(char::is_uppercase) {
        return Some(words);
    }

    Some(
        words
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn percent_decode(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned(),
    }
}
