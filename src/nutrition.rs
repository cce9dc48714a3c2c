//! Nutrition totals, per-serving and per-meal views, and the nutrition API
//! collaborator.

use async_trait::async_trait;
use log::{debug, error, warn};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::ImportError;
use crate::lexicon::Lexicon;
use crate::model::{Macro, MacroValues, Nutrition, NutritionBasis, NutritionFigures, RawNutrition};

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:,\d{3})*(?:\.\d+)?)\s*(kcal|cal|kj|mg|mcg|µg|g)?\b").unwrap()
});

static DESSERT: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "dessert", "cake", "cupcake", "cheesecake", "cookie", "brownie", "blondie", "pie",
        "tart", "pudding", "ice cream", "fudge", "cobbler", "crumble", "frosting",
    ])
});
static SIDE: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&["side", "side dish", "salad", "slaw", "coleslaw", "vegetable"])
});
static SNACK: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "snack", "appetizer", "starter", "dip", "bite", "energy ball", "finger food",
    ])
});
static MAIN: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&["main", "main course", "main dish", "entree", "entrée", "dinner"])
});

/// What role a dish plays in a meal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DishType {
    #[default]
    Main,
    Side,
    Dessert,
    Snack,
}

impl DishType {
    /// Fraction of a meal one serving represents
    pub fn meal_factor(&self) -> f64 {
        match self {
            DishType::Main => 1.0,
            DishType::Side => 1.0 / 2.5,
            DishType::Dessert => 0.5,
            DishType::Snack => 1.0 / 1.5,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DishType::Main => "main-dish",
            DishType::Side => "side-dish",
            DishType::Dessert => "dessert",
            DishType::Snack => "snack",
        }
    }

    /// Dish type named in `text`, if any
    pub fn from_text(text: &str, include_main: bool) -> Option<DishType> {
        if DESSERT.is_match(text) {
            Some(DishType::Dessert)
        } else if SIDE.is_match(text) {
            Some(DishType::Side)
        } else if SNACK.is_match(text) {
            Some(DishType::Snack)
        } else if include_main && MAIN.is_match(text) {
            Some(DishType::Main)
        } else {
            None
        }
    }

    /// Source category and keywords first, then the title, else main
    pub fn detect(title: &str, category: &[String], keywords: &[String]) -> DishType {
        let labels = category
            .iter()
            .chain(keywords)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        DishType::from_text(&labels, true)
            .or_else(|| DishType::from_text(title, false))
            .unwrap_or_default()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Numeric value of a raw nutrition string in the unit the record uses:
/// kcal for calories, mg for sodium, grams for everything else.
pub fn parse_amount(raw: &str, field: Macro) -> Option<f64> {
    let caps = AMOUNT.captures(raw)?;
    let value: f64 = caps[1].replace(',', "").parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_lowercase());

    let value = match (field, unit.as_deref()) {
        (Macro::Calories, Some("kj")) => value / 4.184,
        (Macro::Calories, _) => value,
        (Macro::Sodium, Some("g")) => value * 1000.0,
        (Macro::Sodium, Some("mcg" | "µg")) => value / 1000.0,
        (Macro::Sodium, _) => value,
        (_, Some("mg")) => value / 1000.0,
        (_, Some("mcg" | "µg")) => value / 1_000_000.0,
        (_, _) => value,
    };
    value.is_finite().then_some(value)
}

/// Combines explicit source figures and a nutrition-API response into the
/// record's three nutrition views.
pub struct NutritionNormalizer;

impl NutritionNormalizer {
    pub fn parse_explicit(raw: &RawNutrition) -> NutritionFigures {
        let mut values = MacroValues::default();
        for (field, text) in &raw.values {
            match parse_amount(text, *field) {
                Some(value) => values.set(*field, Some(value)),
                None => debug!("NutritionNormalizer: unreadable {} value {:?}", field, text),
            }
        }
        NutritionFigures {
            values,
            basis: raw.basis,
        }
    }

    /// Explicit figures win per macro; the API only fills gaps.
    pub fn normalize(
        explicit: &NutritionFigures,
        api: Option<&NutritionFigures>,
        servings: Option<u32>,
        dish: DishType,
    ) -> Nutrition {
        let servings = f64::from(servings.unwrap_or(1).max(1));
        let to_total = |value: f64, basis: NutritionBasis| match basis {
            NutritionBasis::Total => value,
            NutritionBasis::PerServing => value * servings,
        };

        let mut totals = MacroValues::default();
        for field in Macro::ALL {
            let from_source = explicit
                .values
                .get(field)
                .map(|v| to_total(v, explicit.basis));
            let from_api = api.and_then(|figures| {
                figures
                    .values
                    .get(field)
                    .map(|v| to_total(v, figures.basis))
            });
            totals.set(field, from_source.or(from_api));
        }

        let factor = dish.meal_factor();
        let per_serving = totals.map(|v| v / servings);
        Nutrition {
            raw: totals.map(round1),
            per_meal: per_serving.map(|v| round1(v / factor)),
            per_serving: per_serving.map(round1),
        }
    }

    /// Per-serving and per-meal views for a different servings count;
    /// the totals are unchanged
    pub fn rescale(nutrition: &Nutrition, from: Option<u32>, to: Option<u32>) -> Nutrition {
        let from = f64::from(from.unwrap_or(1).max(1));
        let to = f64::from(to.unwrap_or(1).max(1));
        Nutrition {
            raw: nutrition.raw.clone(),
            per_serving: nutrition.raw.map(|v| round1(v / to)),
            per_meal: nutrition.per_meal.map(|v| round1(v * from / to)),
        }
    }
}

/// Source of computed nutrition totals for an ingredient list
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// Whole-recipe figures, or `None` when the service cannot answer
    async fn lookup(&self, ingredients: &[String]) -> Option<NutritionFigures>;
}

#[derive(Debug, Deserialize)]
struct NutrientQuantity {
    quantity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutritionDataResponse {
    #[serde(default)]
    calories: Option<f64>,
    #[serde(default)]
    total_nutrients: HashMap<String, NutrientQuantity>,
}

impl NutritionDataResponse {
    fn into_figures(self) -> Option<NutritionFigures> {
        let mut values = MacroValues::default();
        let codes = [
            (Macro::Protein, "PROCNT"),
            (Macro::Carbs, "CHOCDF"),
            (Macro::Fat, "FAT"),
            (Macro::Fiber, "FIBTG"),
            (Macro::Sugar, "SUGAR"),
            (Macro::Sodium, "NA"),
        ];
        let calories = self
            .calories
            .or_else(|| self.total_nutrients.get("ENERC_KCAL").map(|n| n.quantity));
        values.set(Macro::Calories, calories);
        for (field, code) in codes {
            values.set(field, self.total_nutrients.get(code).map(|n| n.quantity));
        }

        // the service answers 0 kcal and no nutrients for text it cannot parse
        if values.is_empty() || (values.calories == Some(0.0) && self.total_nutrients.is_empty()) {
            return None;
        }
        Some(NutritionFigures {
            values,
            basis: NutritionBasis::Total,
        })
    }
}

/// Client for an Edamam-style `nutrition-data` endpoint
pub struct EdamamClient {
    client: Client,
    base_url: String,
    app_id: String,
    app_key: String,
}

impl EdamamClient {
    pub fn new(
        app_id: impl Into<String>,
        app_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ImportError> {
        Self::with_base_url(app_id, app_key, "https://api.edamam.com", timeout)
    }

    pub fn with_base_url(
        app_id: impl Into<String>,
        app_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ImportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(EdamamClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            app_key: app_key.into(),
        })
    }

    async fn request(&self, ingredients: &[String]) -> Result<Option<NutritionFigures>, ImportError> {
        let url = format!("{}/api/nutrition-data", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("ingr", ingredients.join("\n").as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Nutrition API rate limit reached; skipping lookup");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ImportError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body: NutritionDataResponse = response.json().await?;
        Ok(body.into_figures())
    }
}

#[async_trait]
impl NutritionLookup for EdamamClient {
    async fn lookup(&self, ingredients: &[String]) -> Option<NutritionFigures> {
        if ingredients.is_empty() {
            return None;
        }
        match self.request(ingredients).await {
            Ok(Some(figures)) => {
                debug!("Nutrition API returned {:?}", figures.values);
                Some(figures)
            }
            Ok(None) => {
                warn!("Nutrition API had no data for {} ingredients", ingredients.len());
                None
            }
            Err(e) => {
                error!("Nutrition lookup failed: {}", e);
                None
            }
        }
    }
}
