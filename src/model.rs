use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ImportError;
use crate::identity;

/// One recipe's unparsed text span, as produced by the segmenter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    pub text: String,
    pub source_url: Option<String>,
    pub source_label: Option<String>,
}

impl RawBlock {
    pub fn new(text: impl Into<String>) -> Self {
        RawBlock {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, label: impl Into<String>, url: Option<String>) -> Self {
        self.source_label = Some(label.into());
        self.source_url = url;
        self
    }
}

/// The seven nutrition fields every nutrition sub-object is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Macro {
    Calories,
    Protein,
    Carbs,
    Fat,
    Fiber,
    Sugar,
    Sodium,
}

impl Macro {
    pub const ALL: [Macro; 7] = [
        Macro::Calories,
        Macro::Protein,
        Macro::Carbs,
        Macro::Fat,
        Macro::Fiber,
        Macro::Sugar,
        Macro::Sodium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Macro::Calories => "calories",
            Macro::Protein => "protein",
            Macro::Carbs => "carbs",
            Macro::Fat => "fat",
            Macro::Fiber => "fiber",
            Macro::Sugar => "sugar",
            Macro::Sodium => "sodium",
        }
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values for the seven macros. An absent macro is `None` and is omitted
/// from the serialized record instead of being written as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

impl MacroValues {
    pub fn get(&self, field: Macro) -> Option<f64> {
        match field {
            Macro::Calories => self.calories,
            Macro::Protein => self.protein,
            Macro::Carbs => self.carbs,
            Macro::Fat => self.fat,
            Macro::Fiber => self.fiber,
            Macro::Sugar => self.sugar,
            Macro::Sodium => self.sodium,
        }
    }

    pub fn set(&mut self, field: Macro, value: Option<f64>) {
        let slot = match field {
            Macro::Calories => &mut self.calories,
            Macro::Protein => &mut self.protein,
            Macro::Carbs => &mut self.carbs,
            Macro::Fat => &mut self.fat,
            Macro::Fiber => &mut self.fiber,
            Macro::Sugar => &mut self.sugar,
            Macro::Sodium => &mut self.sodium,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        Macro::ALL.iter().all(|m| self.get(*m).is_none())
    }

    /// Apply `f` to every present macro, keeping absent ones absent
    pub fn map(&self, f: impl Fn(f64) -> f64) -> MacroValues {
        let mut out = MacroValues::default();
        for field in Macro::ALL {
            out.set(field, self.get(field).map(&f));
        }
        out
    }
}

/// Recipe nutrition: whole-recipe totals plus per-serving and per-meal views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(flatten)]
    pub raw: MacroValues,
    #[serde(default, skip_serializing_if = "MacroValues::is_empty")]
    pub per_serving: MacroValues,
    #[serde(default, skip_serializing_if = "MacroValues::is_empty")]
    pub per_meal: MacroValues,
}

impl Nutrition {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.per_serving.is_empty() && self.per_meal.is_empty()
    }
}

/// Whether nutrition figures describe one serving or the whole recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NutritionBasis {
    #[default]
    PerServing,
    Total,
}

/// Numeric nutrition figures from one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionFigures {
    pub values: MacroValues,
    pub basis: NutritionBasis,
}

/// Unparsed nutrition strings as they appeared in the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNutrition {
    pub values: BTreeMap<Macro, String>,
    pub basis: NutritionBasis,
}

impl RawNutrition {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Unparsed metadata strings ("Prep Time: 30 minutes", "PT1H", "6-8")
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub servings: Option<String>,
    pub cuisine: Option<String>,
    pub category: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub servings: Option<u32>,
    pub cuisine: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Easy,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Easy => "easy",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-provided signals that later stages read but that are not
/// part of the persisted record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceHints {
    pub raw_metadata: RawMetadata,
    pub nutrition: RawNutrition,
    /// Literal tag of the originating channel ("facebook", a site slug)
    pub source_tag: String,
}

/// In-progress recipe. Each stage takes the draft by value and returns
/// the next version of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub metadata: Metadata,
    pub nutrition: Nutrition,
    pub tags: BTreeSet<String>,
    pub complexity: Option<Complexity>,
    pub image_url: Option<String>,
    pub raw_content: String,
    pub source: String,
    pub source_url: Option<String>,
    pub hints: SourceHints,
}

/// The persisted JSON record consumed by downstream import tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub source: String,
    pub source_url: Option<String>,
    #[serde(with = "date_format")]
    pub date_scraped: DateTime<Utc>,
    pub complexity: Complexity,
    pub metadata: Metadata,
    pub nutrition: Nutrition,
    pub image_url: Option<String>,
    pub tags: BTreeSet<String>,
    pub raw_content: String,
}

/// A finalized, immutable recipe together with its identity key
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecipe {
    record: RecipeRecord,
    identity_key: String,
}

impl CanonicalRecipe {
    /// Freeze a record; the identity key is always derived, never supplied
    pub fn from_record(record: RecipeRecord) -> Self {
        let identity_key = identity::identity_key(&record.title, &record.source);
        CanonicalRecipe {
            record,
            identity_key,
        }
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    pub fn record(&self) -> &RecipeRecord {
        &self.record
    }

    pub fn into_record(self) -> RecipeRecord {
        self.record
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.record.tags
    }

    pub fn to_json(&self) -> Result<String, ImportError> {
        Ok(serde_json::to_string_pretty(&self.record)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let record: RecipeRecord = serde_json::from_str(json)?;
        Ok(CanonicalRecipe::from_record(record))
    }
}

mod date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
