use super::clean::{clean_line, decode_html_symbols};
use super::{ExtractedFields, Extractor, ParsingContext};
use crate::model::{Macro, NutritionBasis, RawMetadata, RawNutrition};
use log::debug;
use scraper::Selector;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type='application/ld+json']").unwrap());

/// Reads a schema.org `Recipe` object from the page's JSON-LD scripts
pub struct JsonLdExtractor;

impl JsonLdExtractor {
    fn convert(&self, recipe: JsonLdRecipe) -> ExtractedFields {
        let ingredients = match recipe.recipe_ingredient {
            Some(RecipeIngredients::Strings(items)) => items
                .iter()
                .map(|ing| clean_line(ing))
                .filter(|ing| !ing.is_empty())
                .collect(),
            Some(RecipeIngredients::Objects(items)) => items
                .into_iter()
                .filter(|ing| !ing.name.trim().is_empty())
                .map(|ing| {
                    let amount = ing.amount.as_deref().unwrap_or("").trim();
                    let name = clean_line(&ing.name);
                    if amount.is_empty() {
                        name
                    } else {
                        format!("{amount} {name}")
                    }
                })
                .collect(),
            None => Vec::new(),
        };

        let instructions = recipe
            .recipe_instructions
            .map(instruction_steps)
            .unwrap_or_default()
            .iter()
            .map(|step| clean_line(step))
            .filter(|step| !step.is_empty())
            .collect();

        let image_url = recipe.image.and_then(|img| match img {
            ImageType::String(i) => Some(decode_html_symbols(&i)),
            ImageType::MultipleStrings(imgs) => imgs.first().map(|i| decode_html_symbols(i)),
            ImageType::Object(i) => Some(i.url),
            ImageType::MultipleObjects(imgs) => imgs.into_iter().next().map(|i| i.url),
            ImageType::None => None,
        });

        let servings = recipe.recipe_yield.and_then(|yield_val| match yield_val {
            RecipeYield::String(s) => Some(s),
            RecipeYield::Number(n) => Some(n.to_string()),
            // prefer the bare number over "4 servings"
            RecipeYield::Array(arr) => arr
                .iter()
                .find(|s| s.chars().all(|c| c.is_ascii_digit()))
                .or_else(|| arr.first())
                .cloned(),
        });

        let metadata = RawMetadata {
            prep_time: recipe.prep_time.filter(|t| !t.is_empty()),
            cook_time: recipe.cook_time.filter(|t| !t.is_empty()),
            total_time: recipe.total_time.filter(|t| !t.is_empty()),
            servings: servings.filter(|s| !s.is_empty()),
            cuisine: recipe
                .recipe_cuisine
                .map(StringOrList::into_vec)
                .and_then(|v| v.into_iter().next()),
            category: recipe
                .recipe_category
                .map(StringOrList::into_vec)
                .unwrap_or_default(),
            keywords: recipe
                .keywords
                .map(|k| match k {
                    StringOrList::Single(s) => s.split(',').map(str::to_string).collect(),
                    StringOrList::Multiple(v) => v,
                })
                .unwrap_or_default()
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        };

        ExtractedFields {
            title: recipe
                .name
                .map(|n| decode_html_symbols(&n))
                .filter(|n| !n.trim().is_empty()),
            ingredients,
            instructions,
            image_url: image_url.filter(|u| !u.is_empty()),
            source_url: None,
            metadata,
            nutrition: recipe.nutrition.map(|n| n.into_raw()).unwrap_or_default(),
        }
    }
}

fn step_texts(step: HowToStep) -> Vec<String> {
    // prefer text over name
    match (step.text, step.name) {
        (Some(text), _) => vec![text],
        (None, Some(name)) => vec![name],
        (None, None) => step.description.into_iter().collect(),
    }
}

fn howto_texts(howto: HowTo) -> Vec<String> {
    match howto {
        HowTo::HowToStep(step) => step_texts(step),
        HowTo::HowToSection(section) => section
            .item_list_element
            .into_iter()
            .flat_map(step_texts)
            .collect(),
    }
}

fn instruction_steps(instructions: RecipeInstructions) -> Vec<String> {
    match instructions {
        RecipeInstructions::String(text) => text
            .lines()
            .map(str::to_string)
            .collect(),
        RecipeInstructions::Multiple(steps) => steps,
        RecipeInstructions::MultipleObject(steps) => steps.into_iter().map(|s| s.text).collect(),
        RecipeInstructions::HowTo(sections) => sections.into_iter().flat_map(howto_texts).collect(),
        RecipeInstructions::NestedSections(sections) => sections
            .into_iter()
            .flatten()
            .flat_map(howto_texts)
            .collect(),
    }
}

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    name: Option<String>,
    image: Option<ImageType>,
    #[serde(rename = "recipeIngredient")]
    recipe_ingredient: Option<RecipeIngredients>,
    #[serde(rename = "recipeInstructions")]
    recipe_instructions: Option<RecipeInstructions>,
    #[serde(rename = "recipeYield")]
    recipe_yield: Option<RecipeYield>,
    #[serde(rename = "prepTime")]
    prep_time: Option<String>,
    #[serde(rename = "cookTime")]
    cook_time: Option<String>,
    #[serde(rename = "totalTime")]
    total_time: Option<String>,
    #[serde(rename = "recipeCategory")]
    recipe_category: Option<StringOrList>,
    #[serde(rename = "recipeCuisine")]
    recipe_cuisine: Option<StringOrList>,
    keywords: Option<StringOrList>,
    nutrition: Option<NutritionInformation>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageType {
    None,
    String(String),
    Object(ImageObject),
    MultipleStrings(Vec<String>),
    MultipleObjects(Vec<ImageObject>),
}

#[derive(Debug, Deserialize)]
struct RecipeInstructionObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeIngredients {
    Strings(Vec<String>),
    Objects(Vec<IngredientObject>),
}

#[derive(Debug, Deserialize)]
struct IngredientObject {
    name: String,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    String(String),
    Multiple(Vec<String>),
    MultipleObject(Vec<RecipeInstructionObject>),
    HowTo(Vec<HowTo>),
    NestedSections(Vec<Vec<HowTo>>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum HowTo {
    HowToStep(HowToStep),
    HowToSection(HowToSection),
}

#[derive(Debug, Deserialize)]
struct HowToStep {
    text: Option<String>,
    description: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HowToSection {
    #[serde(rename = "itemListElement")]
    item_list_element: Vec<HowToStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeYield {
    String(String),
    Number(i64),
    Array(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::Single(s) => vec![s],
            StringOrList::Multiple(v) => v,
        }
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Quantity {
    Text(String),
    Number(f64),
}

impl Quantity {
    fn into_text(self) -> String {
        match self {
            Quantity::Text(s) => s,
            Quantity::Number(n) => n.to_string(),
        }
    }
}

/// schema.org `NutritionInformation`; values are per serving
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutritionInformation {
    calories: Option<Quantity>,
    protein_content: Option<Quantity>,
    carbohydrate_content: Option<Quantity>,
    fat_content: Option<Quantity>,
    fiber_content: Option<Quantity>,
    sugar_content: Option<Quantity>,
    sodium_content: Option<Quantity>,
}

impl NutritionInformation {
    fn into_raw(self) -> RawNutrition {
        let mut raw = RawNutrition {
            basis: NutritionBasis::PerServing,
            ..Default::default()
        };
        let entries = [
            (Macro::Calories, self.calories),
            (Macro::Protein, self.protein_content),
            (Macro::Carbs, self.carbohydrate_content),
            (Macro::Fat, self.fat_content),
            (Macro::Fiber, self.fiber_content),
            (Macro::Sugar, self.sugar_content),
            (Macro::Sodium, self.sodium_content),
        ];
        for (field, value) in entries {
            if let Some(text) = value.map(Quantity::into_text).filter(|t| !t.trim().is_empty()) {
                raw.values.insert(field, text.trim().to_string());
            }
        }
        raw
    }
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(type_str)) => type_str.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

fn find_recipe(json_ld: &Value) -> Option<&Value> {
    if let Some(arr) = json_ld.as_array() {
        debug!("JsonLdExtractor: JSON-LD is an array");
        return arr.iter().find_map(|item| {
            if is_recipe_type(item) || item.get("recipeInstructions").is_some() {
                Some(item)
            } else {
                find_recipe(item)
            }
        });
    }
    if is_recipe_type(json_ld) {
        debug!("JsonLdExtractor: Found Recipe type in root");
        return Some(json_ld);
    }
    if let Some(graph) = json_ld.get("@graph").and_then(Value::as_array) {
        debug!("JsonLdExtractor: Found @graph");
        return graph.iter().find(|item| is_recipe_type(item));
    }
    None
}

impl Extractor for JsonLdExtractor {
    fn name(&self) -> &'static str {
        "JsonLdExtractor"
    }

    fn try_extract(&self, context: &ParsingContext) -> ExtractedFields {
        let scripts: Vec<_> = context.document.select(&SCRIPT).collect();
        debug!(
            "JsonLdExtractor: Found {} JSON-LD script tags for {}",
            scripts.len(),
            context.url
        );

        for (index, script) in scripts.iter().enumerate() {
            let cleaned_json = sanitize_json(&script.inner_html());
            let json_ld = match serde_json::from_str::<Value>(&cleaned_json) {
                Ok(json_ld) => json_ld,
                Err(e) => {
                    debug!("JsonLdExtractor: Failed to parse JSON-LD {}: {}", index, e);
                    continue;
                }
            };

            let Some(recipe) = find_recipe(&json_ld) else {
                debug!("JsonLdExtractor: No recipe found in JSON-LD {}", index);
                continue;
            };

            match serde_json::from_value::<JsonLdRecipe>(recipe.clone()) {
                Ok(recipe) => return self.convert(recipe),
                Err(e) => {
                    debug!("JsonLdExtractor: Failed to convert to JsonLdRecipe: {}", e);
                }
            }
        }

        ExtractedFields::default()
    }
}

/// Repairs the JSON-LD that CMS plugins commonly emit: missing commas
/// between members, doubled commas and trailing commas.
fn sanitize_json(json_str: &str) -> String {
    let mut minified = String::with_capacity(json_str.len());
    let mut in_string = false;
    let mut prev_char = None;
    let mut depth = 0;
    let chars: Vec<char> = json_str.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '"' if prev_char != Some('\\') => {
                in_string = !in_string;
                if !in_string {
                    let next_char = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if !matches!(prev_char, Some(',') | Some('[') | Some('{'))
                        && matches!(next_char, Some('"' | '[' | '{'))
                    {
                        minified.push('"');
                        minified.push(',');
                        prev_char = Some(',');
                        continue;
                    }
                }
                minified.push(c);
            }
            '[' | '{' if !in_string => {
                depth += 1;
                minified.push(c);
            }
            ']' | '}' if !in_string => {
                depth -= 1;
                minified.push(c);
                let next_char = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if depth > 0 && matches!(next_char, Some('"')) {
                    minified.push(',');
                    prev_char = Some(',');
                    continue;
                }
            }
            ',' if !in_string => {
                if prev_char != Some(',') {
                    minified.push(c);
                }
            }
            ':' if !in_string => {
                if prev_char == Some(',') {
                    minified.pop();
                }
                minified.push(c);
            }
            _ => {
                if in_string || !c.is_whitespace() {
                    minified.push(c);
                }
            }
        }
        prev_char = Some(c);
    }

    minified
        .replace(",]", "]")
        .replace(",}", "}")
        .replace(",,", ",")
}
