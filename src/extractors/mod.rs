use log::debug;
use scraper::Html;

use crate::error::ImportError;
use crate::model::{RawBlock, RawMetadata, RawNutrition, SourceHints};
use crate::sites::SiteRegistry;

pub mod clean;
mod heuristic;
mod json_ld;
mod open_graph;
mod site_selectors;
mod text;

pub use heuristic::HeuristicExtractor;
pub use json_ld::JsonLdExtractor;
pub use open_graph::OpenGraphExtractor;
pub use site_selectors::SiteSelectorExtractor;
pub use text::TextExtractor;

/// A fetched page and where it came from
pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        ParsingContext {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

/// Whatever one strategy managed to find. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub metadata: RawMetadata,
    pub nutrition: RawNutrition,
}

fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
    if slot.is_none() {
        *slot = other;
    }
}

fn fill_vec<T>(slot: &mut Vec<T>, other: Vec<T>) {
    if slot.is_empty() {
        *slot = other;
    }
}

impl ExtractedFields {
    /// Fill every empty field from `other`; fields already set are kept
    pub fn fill_from(&mut self, other: ExtractedFields) {
        fill(&mut self.title, other.title.filter(|t| !t.is_empty()));
        fill_vec(&mut self.ingredients, other.ingredients);
        fill_vec(&mut self.instructions, other.instructions);
        fill(&mut self.image_url, other.image_url);
        fill(&mut self.source_url, other.source_url);

        let meta = &mut self.metadata;
        fill(&mut meta.prep_time, other.metadata.prep_time);
        fill(&mut meta.cook_time, other.metadata.cook_time);
        fill(&mut meta.total_time, other.metadata.total_time);
        fill(&mut meta.servings, other.metadata.servings);
        fill(&mut meta.cuisine, other.metadata.cuisine);
        fill_vec(&mut meta.category, other.metadata.category);
        fill_vec(&mut meta.keywords, other.metadata.keywords);

        if self.nutrition.is_empty() {
            self.nutrition = other.nutrition;
        }
    }

    /// True when no later strategy could add anything the pipeline needs
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && !self.ingredients.is_empty()
            && !self.instructions.is_empty()
            && self.image_url.is_some()
    }
}

/// Fields that passed validation: title resolved, both lists non-empty
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub hints: SourceHints,
}

impl TryFrom<ExtractedFields> for RecipeFields {
    type Error = ImportError;

    fn try_from(fields: ExtractedFields) -> Result<Self, Self::Error> {
        let ingredients: Vec<String> = fields
            .ingredients
            .into_iter()
            .filter(|i| !i.trim().is_empty())
            .collect();
        let instructions: Vec<String> = fields
            .instructions
            .into_iter()
            .filter(|i| !i.trim().is_empty())
            .collect();

        if ingredients.is_empty() {
            return Err(ImportError::MalformedInput(
                "no ingredients could be extracted".to_string(),
            ));
        }
        if instructions.is_empty() {
            return Err(ImportError::MalformedInput(
                "no instructions could be extracted".to_string(),
            ));
        }

        let title = fields
            .title
            .map(|t| clean::clean_title(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| clean::placeholder_title(&ingredients[0]));

        Ok(RecipeFields {
            title,
            ingredients,
            instructions,
            image_url: fields.image_url.filter(|u| !u.trim().is_empty()),
            source_url: fields.source_url.filter(|u| !u.trim().is_empty()),
            hints: SourceHints {
                raw_metadata: fields.metadata,
                nutrition: fields.nutrition,
                ..Default::default()
            },
        })
    }
}

/// One link of the web strategy chain
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_extract(&self, context: &ParsingContext) -> ExtractedFields;
}

/// Runs the strategy chain; each field comes from the first strategy that
/// produced it.
pub struct FieldExtractor {
    strategies: Vec<Box<dyn Extractor>>,
}

impl FieldExtractor {
    pub fn new(strategies: Vec<Box<dyn Extractor>>) -> Self {
        FieldExtractor { strategies }
    }

    /// JSON-LD, then Open Graph, then per-site selectors, then the text scan
    pub fn web(registry: SiteRegistry) -> Self {
        FieldExtractor::new(vec![
            Box::new(JsonLdExtractor),
            Box::new(OpenGraphExtractor),
            Box::new(SiteSelectorExtractor::new(registry)),
            Box::new(HeuristicExtractor),
        ])
    }

    pub fn extract_document(&self, context: &ParsingContext) -> ExtractedFields {
        let mut fields = ExtractedFields::default();
        for strategy in &self.strategies {
            let found = strategy.try_extract(context);
            debug!(
                "{}: title={} ingredients={} instructions={} image={}",
                strategy.name(),
                found.title.is_some(),
                found.ingredients.len(),
                found.instructions.len(),
                found.image_url.is_some()
            );
            fields.fill_from(found);
            if fields.is_complete() {
                debug!("All fields resolved after {}", strategy.name());
                break;
            }
        }
        fields
    }

    pub fn extract_block(&self, block: &RawBlock) -> ExtractedFields {
        let mut fields = TextExtractor::extract(&block.text);
        if block.source_url.is_some() {
            fields.source_url = block.source_url.clone();
        }
        fields
    }
}
