use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use super::clean::{clean_line, strip_bullet, strip_step_number};
use super::ExtractedFields;
use crate::metadata::{parse_duration, parse_servings};
use crate::model::{Macro, NutritionBasis, RawMetadata, RawNutrition};

const INGREDIENT_HEADERS: &[&str] = &[
    "ingredients",
    "ingredient list",
    "ingredient",
    "what you need",
    "what you'll need",
    "you will need",
    "you'll need",
    "shopping list",
];

const INSTRUCTION_HEADERS: &[&str] = &[
    "instructions",
    "directions",
    "method",
    "steps",
    "preparation",
    "how to make it",
    "how to make",
    "procedure",
];

const NUTRITION_HEADERS: &[&str] = &[
    "nutrition facts",
    "nutrition information",
    "nutrition info",
    "nutrition",
    "macros",
];

const OTHER_HEADERS: &[&str] = &["recipe notes", "notes", "note", "tips", "equipment"];

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());

/// "Protein: 20g", "Sodium 400 mg"
static LABELLED_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(calories|kcal|energy|protein|total carbohydrates?|carbohydrates?|total carbs|carbs|total fat|fat|dietary fiber|fiber|fibre|sugars?|sodium)\b\s*[:=\-]?\s*(\d+(?:\.\d+)?)\s*(kcal|cal|mg|g)?\b",
    )
    .unwrap()
});

/// "350 kcal", "20g protein"
static VALUE_FIRST_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(kcal|cal|mg|g)?\s*(calories|kcal|protein|carbs|carbohydrates|fat|fiber|fibre|sugars?|sodium)\b",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Ingredients,
    Instructions,
    Nutrition,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    PrepTime,
    CookTime,
    TotalTime,
    Servings,
    Cuisine,
    Category,
    Keywords,
}

const META_LABELS: &[(&str, MetaField)] = &[
    ("prep time", MetaField::PrepTime),
    ("preparation time", MetaField::PrepTime),
    ("prep", MetaField::PrepTime),
    ("cook time", MetaField::CookTime),
    ("cooking time", MetaField::CookTime),
    ("bake time", MetaField::CookTime),
    ("baking time", MetaField::CookTime),
    ("active time", MetaField::PrepTime),
    ("active", MetaField::PrepTime),
    ("total time", MetaField::TotalTime),
    ("ready in", MetaField::TotalTime),
    ("total", MetaField::TotalTime),
    ("servings", MetaField::Servings),
    ("serving", MetaField::Servings),
    ("serves", MetaField::Servings),
    ("yields", MetaField::Servings),
    ("yield", MetaField::Servings),
    ("makes", MetaField::Servings),
    ("cuisine", MetaField::Cuisine),
    ("category", MetaField::Category),
    ("course", MetaField::Category),
    ("keywords", MetaField::Keywords),
    ("tags", MetaField::Keywords),
];

/// Header-driven extraction for free-form recipe posts
pub struct TextExtractor;

impl TextExtractor {
    pub fn extract(text: &str) -> ExtractedFields {
        let lines: Vec<&str> = text.lines().collect();
        let mut fields = ExtractedFields {
            source_url: URL
                .find(text)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string()),
            ..Default::default()
        };

        let mut start = 0;
        if let Some(idx) = lines.iter().position(|l| is_title_candidate(l)) {
            let cleaned = clean_line(lines[idx]);
            if header_kind(&cleaned).is_none() && meta_pieces(&cleaned).is_empty() {
                fields.title = Some(cleaned);
                start = idx + 1;
            }
        }

        let mut section = Section::Preamble;
        let mut nutrition_basis = NutritionBasis::PerServing;

        for line in &lines[start..] {
            let cleaned = clean_line(line);
            if cleaned.is_empty() || is_bare_url(&cleaned) {
                continue;
            }
            let lower = cleaned.to_lowercase();

            if is_hashtag_line(&cleaned) {
                fields.metadata.keywords.extend(
                    cleaned
                        .split_whitespace()
                        .map(|t| t.trim_start_matches('#').to_lowercase())
                        .filter(|t| !t.is_empty()),
                );
                continue;
            }

            let in_list = matches!(section, Section::Ingredients | Section::Instructions);
            if in_list {
                if capture_list_metadata(&mut fields.metadata, &cleaned) {
                    continue;
                }
            } else if capture_metadata(&mut fields.metadata, &cleaned) {
                continue;
            }

            if let Some((next, inline)) = header_kind(&cleaned) {
                debug!("TextExtractor: entering {:?} section", next);
                if next == Section::Nutrition && mentions_whole_recipe(&lower) {
                    nutrition_basis = NutritionBasis::Total;
                }
                section = next;
                match (section, inline) {
                    (Section::Ingredients, Some(item)) => push_ingredient(&mut fields, &item),
                    (Section::Instructions, Some(item)) => push_instruction(&mut fields, &item),
                    (Section::Nutrition, Some(item)) => {
                        capture_nutrition(&mut fields.nutrition, &item);
                    }
                    _ => {}
                }
                continue;
            }

            if section == Section::Nutrition || is_nutrition_line(&lower) {
                if mentions_whole_recipe(&lower) {
                    nutrition_basis = NutritionBasis::Total;
                }
                if capture_nutrition(&mut fields.nutrition, &cleaned) {
                    continue;
                }
            }

            match section {
                Section::Ingredients => push_ingredient(&mut fields, &cleaned),
                Section::Instructions => push_instruction(&mut fields, &cleaned),
                Section::Preamble | Section::Nutrition | Section::Other => {}
            }
        }

        fields.nutrition.basis = nutrition_basis;
        debug!(
            "TextExtractor: title={:?} ingredients={} instructions={} nutrition={}",
            fields.title,
            fields.ingredients.len(),
            fields.instructions.len(),
            fields.nutrition.values.len()
        );
        fields
    }
}

fn is_title_candidate(line: &str) -> bool {
    let cleaned = clean_line(line);
    !cleaned.is_empty() && cleaned.chars().any(char::is_alphanumeric) && !is_bare_url(&cleaned)
}

fn is_bare_url(cleaned: &str) -> bool {
    URL.is_match(cleaned) && cleaned.split_whitespace().count() == 1
}

fn is_hashtag_line(cleaned: &str) -> bool {
    cleaned
        .split_whitespace()
        .all(|t| t.starts_with('#') && t.len() > 1)
}

/// "For the sauce:" style group labels inside a list
fn is_subheader(item: &str) -> bool {
    item.ends_with(':') && item.chars().count() < 40
}

fn push_ingredient(fields: &mut ExtractedFields, line: &str) {
    let item = strip_bullet(line);
    if is_subheader(&item) {
        return;
    }
    if item.chars().filter(|c| c.is_alphabetic()).count() >= 2 {
        fields.ingredients.push(item);
    }
}

fn push_instruction(fields: &mut ExtractedFields, line: &str) {
    let item = strip_bullet(&strip_step_number(line));
    if is_subheader(&item) {
        return;
    }
    if item.chars().filter(|c| c.is_alphabetic()).count() >= 3 {
        fields.instructions.push(item);
    }
}

/// Recognizes a section header and returns any content after its colon
fn header_kind(cleaned: &str) -> Option<(Section, Option<String>)> {
    let trimmed = cleaned.trim_start_matches(|c: char| !c.is_alphanumeric());
    let lower = trimmed.to_lowercase();

    let groups: [(&[&str], Section); 4] = [
        (INGREDIENT_HEADERS, Section::Ingredients),
        (INSTRUCTION_HEADERS, Section::Instructions),
        (NUTRITION_HEADERS, Section::Nutrition),
        (OTHER_HEADERS, Section::Other),
    ];

    for (keywords, section) in groups {
        for keyword in keywords {
            let Some(rest) = lower.strip_prefix(keyword) else {
                continue;
            };
            let rest_trimmed = rest.trim_start();
            let is_header = rest_trimmed.is_empty()
                || rest_trimmed.starts_with([':', '(', '-', '–', '—', '/'])
                || rest.starts_with(" for ")
                || rest.starts_with(" per ");
            if !is_header {
                continue;
            }
            // inline content after the colon, in its original casing
            let inline = trimmed
                .find(':')
                .map(|idx| trimmed[idx + 1..].trim().to_string())
                .filter(|s| !s.is_empty());
            return Some((section, inline));
        }
    }
    None
}

struct MetaPiece {
    field: MetaField,
    value: String,
    /// "Prep: 10 mins" rather than "Prep 10 mins"
    has_colon: bool,
}

impl MetaPiece {
    fn resolves(&self) -> bool {
        match self.field {
            MetaField::PrepTime | MetaField::CookTime | MetaField::TotalTime => {
                parse_duration(&self.value).is_some()
            }
            MetaField::Servings => parse_servings(&self.value).is_some(),
            MetaField::Cuisine | MetaField::Category | MetaField::Keywords => true,
        }
    }
}

/// Splits "Prep: 10 mins | Cook: 20 mins" into labelled values
fn meta_pieces(cleaned: &str) -> Vec<MetaPiece> {
    let mut found = Vec::new();
    for piece in cleaned.split(['|', '•', '·']) {
        let piece = piece.trim();
        let lower = piece.to_lowercase();
        for (label, field) in META_LABELS {
            let Some(rest) = lower.strip_prefix(label) else {
                continue;
            };
            if rest.starts_with(|c: char| c.is_alphabetic()) {
                continue;
            }
            let value = piece
                .get(label.len()..)
                .unwrap_or(rest)
                .trim_start_matches([':', '-', '=', ' ', '\t'])
                .trim()
                .to_string();
            let needs_number = !matches!(
                field,
                MetaField::Cuisine | MetaField::Category | MetaField::Keywords
            );
            let has_colon = rest.trim_start().starts_with(':');
            // "Total Fat 10g" is nutrition, not a total time
            let starts_numeric = value
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || "½⅓⅔¼¾".contains(c));
            if value.is_empty()
                || (needs_number && !starts_numeric)
                || (!needs_number && !has_colon)
            {
                continue;
            }
            found.push(MetaPiece {
                field: *field,
                value,
                has_colon,
            });
            break;
        }
    }
    found
}

/// Records labelled metadata found on the line; true if any was found
pub(super) fn capture_metadata(meta: &mut RawMetadata, line: &str) -> bool {
    let pieces = meta_pieces(line);
    let found = !pieces.is_empty();
    for piece in pieces {
        record_meta(meta, piece.field, piece.value);
    }
    found
}

/// Inside an ingredient or instruction list a line is metadata only when
/// every labelled piece has a colon or a value that parses. "Prep 2 baking
/// sheets" stays a step.
fn capture_list_metadata(meta: &mut RawMetadata, line: &str) -> bool {
    let pieces = meta_pieces(line);
    if pieces.is_empty() || !pieces.iter().all(|p| p.has_colon || p.resolves()) {
        return false;
    }
    for piece in pieces {
        record_meta(meta, piece.field, piece.value);
    }
    true
}

fn record_meta(meta: &mut RawMetadata, field: MetaField, value: String) {
    let slot = match field {
        MetaField::PrepTime => &mut meta.prep_time,
        MetaField::CookTime => &mut meta.cook_time,
        MetaField::TotalTime => &mut meta.total_time,
        MetaField::Servings => &mut meta.servings,
        MetaField::Cuisine => &mut meta.cuisine,
        MetaField::Category => {
            meta.category
                .extend(value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
            return;
        }
        MetaField::Keywords => {
            meta.keywords
                .extend(value.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()));
            return;
        }
    };
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn is_nutrition_line(lower: &str) -> bool {
    let starts_with_label = [
        "calories", "kcal", "protein", "carbs", "carbohydrate", "fat", "total fat", "fiber",
        "fibre", "sugar", "sodium",
    ]
    .iter()
    .any(|label| {
        lower.strip_prefix(label).is_some_and(|rest| {
            let rest = rest.trim_start();
            rest.starts_with(':') || rest.starts_with(|c: char| c.is_ascii_digit())
        })
    });
    starts_with_label
        || (VALUE_FIRST_MACRO.is_match(lower)
            && (lower.contains("kcal") || lower.contains("calories")))
}

fn mentions_whole_recipe(lower: &str) -> bool {
    ["whole recipe", "entire recipe", "per recipe", "total recipe", "in total"]
        .iter()
        .any(|p| lower.contains(p))
}

fn macro_for(label: &str) -> Option<Macro> {
    let label = label.to_lowercase();
    let field = match label.as_str() {
        "calories" | "kcal" | "energy" => Macro::Calories,
        "protein" => Macro::Protein,
        l if l.contains("carb") => Macro::Carbs,
        l if l.contains("fat") => Macro::Fat,
        l if l.contains("fiber") || l == "fibre" => Macro::Fiber,
        l if l.starts_with("sugar") => Macro::Sugar,
        "sodium" => Macro::Sodium,
        _ => return None,
    };
    Some(field)
}

/// Records every macro found on the line; true if any was found
pub(super) fn capture_nutrition(nutrition: &mut RawNutrition, line: &str) -> bool {
    let mut found = false;
    for caps in LABELLED_MACRO.captures_iter(line) {
        if let Some(field) = macro_for(&caps[1]) {
            let unit = caps.get(3).map_or("", |m| m.as_str());
            nutrition
                .values
                .entry(field)
                .or_insert_with(|| format!("{}{}", &caps[2], unit));
            found = true;
        }
    }
    for caps in VALUE_FIRST_MACRO.captures_iter(line) {
        if let Some(field) = macro_for(&caps[3]) {
            let unit = caps.get(2).map_or("", |m| m.as_str());
            nutrition
                .values
                .entry(field)
                .or_insert_with(|| format!("{}{}", &caps[1], unit));
            found = true;
        }
    }
    found
}
