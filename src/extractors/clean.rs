//! Text cleanup shared by all extraction strategies.

use html_escape::decode_html_entities;
use regex::Regex;
use std::sync::LazyLock;

pub const MAX_TITLE_LEN: usize = 95;

static STEP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:step\s*\d+\s*[:.)\-]?\s*|\d+[.)]\s+|\d+\s+-\s+|#\d+\s*)").unwrap()
});
static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•·▪◦–—>+]+\s*|\d+[.)]\s+)").unwrap());
static LEADING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\d\s/½⅓⅔¼¾⅛.\-]+(?:(?:cups?|c|tbsps?|tablespoons?|tsps?|teaspoons?|oz|ounces?|lbs?|pounds?|g|grams?|kg|ml|l|liters?|cans?|cloves?|pinch|dash|slices?|pieces?|large|medium|small)\b\.?\s*)*(?:of\s+)?",
    )
    .unwrap()
});

pub fn decode_html_symbols(text: &str) -> String {
    // for some reason need to decode twice to get the correct string
    decode_html_entities(&decode_html_entities(text))
        .replace('\u{00a0}', " ")
        .replace('\u{200b}', "")
}

pub fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF
        | 0x2300..=0x23FF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF
        | 0xFE00..=0xFE0F
        | 0x200D
        | 0x20E3
        | 0xE0020..=0xE007F)
}

/// Remove emoji, including keycap sequences like "1️⃣" where the digit
/// itself belongs to the emoji.
pub fn strip_emoji(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let keycap = match chars.get(i + 1) {
            Some('\u{20E3}') => true,
            Some('\u{FE0F}') => chars.get(i + 2) == Some(&'\u{20E3}'),
            _ => false,
        };
        if keycap {
            i += 1;
            continue;
        }
        if !is_emoji(c) {
            out.push(c);
        }
        i += 1;
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode, de-emoji and collapse a source line
pub fn clean_line(text: &str) -> String {
    collapse_whitespace(&strip_emoji(&decode_html_symbols(text)))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Title cleanup: entities decoded, emoji removed, non-alphanumeric edges
/// trimmed, at most 95 characters.
pub fn clean_title(raw: &str) -> String {
    let cleaned = clean_line(raw);
    let trimmed = cleaned.trim_matches(|c: char| !c.is_alphanumeric());
    let truncated = truncate_chars(trimmed, MAX_TITLE_LEN);
    truncated
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

pub fn strip_bullet(line: &str) -> String {
    BULLET_PREFIX.replace(line.trim(), "").trim().to_string()
}

pub fn strip_step_number(line: &str) -> String {
    STEP_PREFIX.replace(line.trim(), "").trim().to_string()
}

/// "2 cups of flour" -> "flour"
pub fn strip_quantity(ingredient: &str) -> String {
    let stripped = LEADING_QUANTITY.replace(ingredient.trim(), "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        ingredient.trim().to_string()
    } else {
        stripped.to_string()
    }
}

/// Placeholder title for posts that start straight with their ingredient list
pub fn placeholder_title(first_ingredient: &str) -> String {
    let name = strip_quantity(&clean_line(first_ingredient));
    let name = name.split(',').next().unwrap_or_default().trim();
    truncate_chars(&format!("Recipe with {name}"), MAX_TITLE_LEN)
}
