//! Turns raw timing, servings and cuisine strings into typed values.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use crate::lexicon::Lexicon;
use crate::model::{Metadata, RawMetadata};

/// A number, a range of numbers, or a fraction: "45", "1.5", "1 1/2", "½", "15-20", "6 to 8"
const NUMBER: &str = r"\d+(?:\.\d+)?(?:\s+\d+/\d+)?|\d+/\d+|\d*[½¼¾⅓⅔]";

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)(?:-(\d+(?:\.\d+)?))?H)?(?:(\d+(?:\.\d+)?)(?:-(\d+(?:\.\d+)?))?M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .unwrap()
});

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({NUMBER})(?:\s*(?:-|–|—|to)\s*({NUMBER}))?\s*(days?|hours?|hrs?|h|minutes?|mins?|m|seconds?|secs?|s)\b"
    ))
    .unwrap()
});

/// "1h30", "2h 15"
static HOURS_THEN_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*h(?:rs?|ours?)?\s*(\d+)$").unwrap());

static BARE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({NUMBER})(?:\s*(?:-|–|—|to)\s*({NUMBER}))?$"
    ))
    .unwrap()
});

static FIRST_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)(?:\s*(?:-|–|—|to)\s*(\d+))?").unwrap()
});

/// Canonical cuisine names and the words that identify them
const CUISINES: &[(&str, &[&str])] = &[
    ("American", &["american"]),
    ("Italian", &["italian", "italy", "tuscan", "sicilian"]),
    ("Mexican", &["mexican", "mexico"]),
    ("Tex-Mex", &["tex-mex", "texmex"]),
    ("Chinese", &["chinese", "china", "szechuan", "sichuan", "cantonese"]),
    ("Japanese", &["japanese", "japan"]),
    ("Thai", &["thai", "thailand"]),
    ("Indian", &["indian", "india"]),
    ("French", &["french", "france", "provencal"]),
    ("Greek", &["greek", "greece"]),
    ("Mediterranean", &["mediterranean"]),
    ("Middle Eastern", &["middle eastern", "middle-eastern"]),
    ("Lebanese", &["lebanese"]),
    ("Turkish", &["turkish"]),
    ("Moroccan", &["moroccan"]),
    ("Korean", &["korean", "korea"]),
    ("Vietnamese", &["vietnamese", "vietnam"]),
    ("Spanish", &["spanish", "spain"]),
    ("German", &["german"]),
    ("British", &["british"]),
    ("Irish", &["irish"]),
    ("Caribbean", &["caribbean", "jamaican"]),
    ("Cuban", &["cuban"]),
    ("Cajun", &["cajun", "creole"]),
    ("Southern", &["southern"]),
    ("Brazilian", &["brazilian"]),
    ("Filipino", &["filipino"]),
    ("Ethiopian", &["ethiopian"]),
    ("Asian", &["asian"]),
];

static CUISINE_WORDS: LazyLock<Lexicon> = LazyLock::new(|| {
    let words: Vec<&str> = CUISINES
        .iter()
        .flat_map(|(_, words)| words.iter().copied())
        .collect();
    Lexicon::new(&words)
});

/// Parses "1 1/2", "½", "2.5", "3"
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let (whole, frac) = match text.char_indices().find(|(_, c)| "½¼¾⅓⅔".contains(*c)) {
        Some((idx, c)) => {
            let frac = match c {
                '½' => 0.5,
                '¼' => 0.25,
                '¾' => 0.75,
                '⅓' => 1.0 / 3.0,
                _ => 2.0 / 3.0,
            };
            (&text[..idx], frac)
        }
        None => (text, 0.0),
    };
    let whole = whole.trim();
    if whole.is_empty() {
        return Some(frac);
    }

    let mut total = frac;
    for part in whole.split_whitespace() {
        total += match part.split_once('/') {
            Some((num, den)) => {
                let den: f64 = den.parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num.parse::<f64>().ok()? / den
            }
            None => part.parse::<f64>().ok()?,
        };
    }
    Some(total)
}

/// A value or the mean of a range
fn number_or_mean(low: &str, high: Option<&str>) -> Option<f64> {
    let low = parse_number(low)?;
    match high.and_then(parse_number) {
        Some(high) => Some((low + high) / 2.0),
        None => Some(low),
    }
}

fn round_whole(minutes: f64) -> Option<u32> {
    if !minutes.is_finite() || minutes < 0.0 {
        return None;
    }
    // f64::round rounds half away from zero
    let rounded = minutes.round();
    (rounded <= f64::from(u32::MAX)).then_some(rounded as u32)
}

fn parse_iso_duration(text: &str) -> Option<u32> {
    let caps = ISO_DURATION.captures(text.trim())?;
    let value = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
    let mean = |lo: usize, hi: usize| match (value(lo), value(hi)) {
        (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
        (lo, _) => lo,
    };

    let days = value(1);
    let hours = mean(2, 3);
    let minutes = mean(4, 5);
    let seconds = value(6);
    if days.is_none() && hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }
    round_whole(
        days.unwrap_or(0.0) * 1440.0
            + hours.unwrap_or(0.0) * 60.0
            + minutes.unwrap_or(0.0)
            + seconds.unwrap_or(0.0) / 60.0,
    )
}

/// Minutes from "PT1H30M", "1 hour 30 minutes", "1 hr 15 mins", "45 min",
/// "1h30", "15-20 minutes" or a bare "45".
pub fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with(['P', 'p']) {
        if let Some(minutes) = parse_iso_duration(text) {
            return Some(minutes);
        }
    }
    if let Some(caps) = HOURS_THEN_MINUTES.captures(text) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        return round_whole(hours * 60.0 + minutes);
    }

    let mut total = 0.0;
    let mut matched = false;
    for caps in DURATION_PART.captures_iter(text) {
        let Some(value) = number_or_mean(&caps[1], caps.get(2).map(|m| m.as_str())) else {
            continue;
        };
        let unit = caps[3].to_lowercase();
        let factor = if unit.starts_with('d') {
            1440.0
        } else if unit.starts_with('h') {
            60.0
        } else if unit.starts_with('s') {
            1.0 / 60.0
        } else {
            1.0
        };
        total += value * factor;
        matched = true;
    }
    if matched {
        return round_whole(total);
    }

    let caps = BARE_NUMBER.captures(text)?;
    round_whole(number_or_mean(&caps[1], caps.get(2).map(|m| m.as_str()))?)
}

/// Servings from "4", "Serves 6–8", "Makes 24 cookies", "4 servings"
pub fn parse_servings(text: &str) -> Option<u32> {
    let caps = FIRST_COUNT.captures(text)?;
    let mean = number_or_mean(&caps[1], caps.get(2).map(|m| m.as_str()))?;
    let servings = round_whole(mean)?;
    (servings > 0).then_some(servings)
}

/// Canonical cuisine name for the first cuisine word in the text
pub fn canonical_cuisine(text: &str) -> Option<String> {
    let word = CUISINE_WORDS.first(text)?;
    CUISINES
        .iter()
        .find(|(_, words)| words.contains(&word.as_str()))
        .map(|(name, _)| name.to_string())
}

/// Typed metadata from raw strings, with the two timing inferences applied.
/// Nothing is defaulted: a field that cannot be resolved stays `None`.
pub struct MetadataResolver;

impl MetadataResolver {
    pub fn resolve(raw: &RawMetadata, title: &str) -> Metadata {
        let mut metadata = Metadata {
            prep_time: raw.prep_time.as_deref().and_then(parse_duration),
            cook_time: raw.cook_time.as_deref().and_then(parse_duration),
            total_time: raw.total_time.as_deref().and_then(parse_duration),
            servings: raw.servings.as_deref().and_then(parse_servings),
            cuisine: raw
                .cuisine
                .as_deref()
                .and_then(canonical_cuisine)
                .or_else(|| canonical_cuisine(title)),
        };

        if metadata.total_time.is_none() {
            if let (Some(prep), Some(cook)) = (metadata.prep_time, metadata.cook_time) {
                debug!("MetadataResolver: total_time inferred as {} + {}", prep, cook);
                metadata.total_time = prep.checked_add(cook);
            }
        }
        if metadata.cook_time.is_none() {
            if let (Some(total), Some(prep)) = (metadata.total_time, metadata.prep_time) {
                if total >= prep {
                    debug!("MetadataResolver: cook_time inferred as {} - {}", total, prep);
                    metadata.cook_time = Some(total - prep);
                }
            }
        }

        metadata
    }
}
