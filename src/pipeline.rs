//! The synchronous stages, from a raw block or page to a canonical recipe.
//!
//! Every stage takes a [`RecipeDraft`] by value and returns the next
//! version of it. Nothing here touches the network or the store, so one
//! `Pipeline` can be shared across threads and blocks processed in parallel.

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, error, info, warn};
use scraper::Selector;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::complexity::ComplexityScorer;
use crate::config::ScraperConfig;
use crate::dietary::DietaryClassifier;
use crate::error::ImportError;
use crate::extractors::clean::collapse_whitespace;
use crate::extractors::{FieldExtractor, ParsingContext, RecipeFields};
use crate::identity::slug;
use crate::metadata::MetadataResolver;
use crate::model::{
    CanonicalRecipe, Metadata, Nutrition, NutritionFigures, RawBlock, RecipeDraft, RecipeRecord,
};
use crate::nutrition::{DishType, NutritionNormalizer};
use crate::segmenter::Segmenter;
use crate::sites::SiteRegistry;
use crate::tags::{TagGenerator, TagInput};

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// A finished recipe plus the degradations met on the way
#[derive(Debug)]
pub struct ImportOutcome {
    pub recipe: CanonicalRecipe,
    /// Never `MalformedInput`; those drop the draft instead
    pub warnings: Vec<ImportError>,
}

/// A block that could not become a recipe
#[derive(Debug)]
pub struct BlockFailure {
    /// Position of the block in its blob
    pub index: usize,
    pub error: ImportError,
}

/// Result of a batch; bad blocks never stop the batch
#[derive(Debug, Default)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
    pub failures: Vec<BlockFailure>,
}

impl ImportReport {
    pub fn recipes(&self) -> impl Iterator<Item = &CanonicalRecipe> {
        self.outcomes.iter().map(|o| &o.recipe)
    }

    pub fn warning_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.warnings.len()).sum()
    }

    /// Records a block that produced no recipe and moves on
    pub fn push_failure(&mut self, index: usize, err: ImportError) {
        if err.is_fatal_for_draft() {
            warn!("Skipping block {}: {}", index, err);
        } else {
            error!("Block {} failed: {}", index, err);
        }
        self.failures.push(BlockFailure { index, error: err });
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub struct Pipeline {
    extractor: FieldExtractor,
    registry: SiteRegistry,
    tags: TagGenerator,
    source_label: String,
    source_tag: String,
    raw_content_limit: usize,
}

impl Pipeline {
    pub fn new(registry: SiteRegistry) -> Self {
        Self::with_config(registry, &ScraperConfig::default())
    }

    /// Built-in sites plus the configured ones
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ImportError> {
        let registry = SiteRegistry::builtin()?.with_sites(config.sites.clone());
        Ok(Self::with_config(registry, config))
    }

    fn with_config(registry: SiteRegistry, config: &ScraperConfig) -> Self {
        Pipeline {
            extractor: FieldExtractor::web(registry.clone()),
            registry,
            tags: TagGenerator::new(config.max_tags),
            source_label: config.source_label.clone(),
            source_tag: config.source_tag.clone(),
            raw_content_limit: config.raw_content_limit,
        }
    }

    fn draft(&self, fields: RecipeFields, source: String, raw_content: &str) -> RecipeDraft {
        RecipeDraft {
            title: fields.title,
            ingredients: fields.ingredients,
            instructions: fields.instructions,
            metadata: Metadata::default(),
            nutrition: Nutrition::default(),
            tags: BTreeSet::new(),
            complexity: None,
            image_url: fields.image_url,
            raw_content: truncate_chars(raw_content, self.raw_content_limit),
            source,
            source_url: fields.source_url,
            hints: fields.hints,
        }
    }

    /// Text path: header-driven extraction over one segmented block
    pub fn draft_from_block(&self, block: &RawBlock) -> Result<RecipeDraft, ImportError> {
        let fields = RecipeFields::try_from(self.extractor.extract_block(block))?;
        let (source, source_tag) = match &block.source_label {
            Some(label) => (label.clone(), slug(label)),
            None => (self.source_label.clone(), self.source_tag.clone()),
        };

        let mut draft = self.draft(fields, source, &block.text);
        draft.hints.source_tag = source_tag;
        debug!("Pipeline: drafted '{}' from text", draft.title);
        Ok(draft)
    }

    /// Web path: the strategy chain over a fetched page
    pub fn draft_from_page(&self, url: &str, html: &str) -> Result<RecipeDraft, ImportError> {
        let context = ParsingContext::new(url, html);
        let mut fields = RecipeFields::try_from(self.extractor.extract_document(&context))?;
        if fields.source_url.is_none() {
            fields.source_url = Some(url.to_string());
        }

        let page_text = context
            .document
            .select(&BODY)
            .next()
            .map(|body| collapse_whitespace(&body.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();
        let source = self.registry.source_for(url);

        let mut draft = self.draft(fields, source.name, &page_text);
        draft.hints.source_tag = source.tag;
        debug!("Pipeline: drafted '{}' from {}", draft.title, url);
        Ok(draft)
    }

    pub fn resolve_metadata(&self, draft: RecipeDraft) -> RecipeDraft {
        let metadata = MetadataResolver::resolve(&draft.hints.raw_metadata, &draft.title);
        RecipeDraft { metadata, ..draft }
    }

    /// Needs resolved metadata for the servings count
    pub fn normalize_nutrition(
        &self,
        draft: RecipeDraft,
        api: Option<&NutritionFigures>,
    ) -> RecipeDraft {
        let explicit = NutritionNormalizer::parse_explicit(&draft.hints.nutrition);
        let raw = &draft.hints.raw_metadata;
        let dish = DishType::detect(&draft.title, &raw.category, &raw.keywords);
        let nutrition =
            NutritionNormalizer::normalize(&explicit, api, draft.metadata.servings, dish);
        RecipeDraft { nutrition, ..draft }
    }

    pub fn score_complexity(&self, draft: RecipeDraft) -> RecipeDraft {
        let complexity = ComplexityScorer::score(draft.ingredients.len(), draft.instructions.len());
        RecipeDraft {
            complexity: Some(complexity),
            ..draft
        }
    }

    /// Runs the dietary classifier over the normalized nutrition
    pub fn generate_tags(&self, draft: RecipeDraft) -> RecipeDraft {
        let dietary = DietaryClassifier::classify(&draft.ingredients, &draft.nutrition.per_serving);
        let complexity = draft.complexity.unwrap_or_else(|| {
            ComplexityScorer::score(draft.ingredients.len(), draft.instructions.len())
        });
        let tags = self.tags.generate(&TagInput {
            source_tag: &draft.hints.source_tag,
            title: &draft.title,
            ingredients: &draft.ingredients,
            instructions: &draft.instructions,
            metadata: &draft.metadata,
            raw_metadata: &draft.hints.raw_metadata,
            dietary: &dietary,
            complexity,
        });
        RecipeDraft { tags, ..draft }
    }

    /// Freeze the draft. `scraped_at` is kept to millisecond precision.
    pub fn finalize(
        &self,
        draft: RecipeDraft,
        scraped_at: DateTime<Utc>,
    ) -> Result<ImportOutcome, ImportError> {
        if draft.ingredients.is_empty() || draft.instructions.is_empty() {
            return Err(ImportError::MalformedInput(format!(
                "'{}' has no ingredients or no instructions",
                draft.title
            )));
        }

        let mut warnings = Vec::new();
        if draft.metadata.servings.is_none() {
            warnings.push(ImportError::PartialData("servings unknown".to_string()));
        }
        if draft.metadata.total_time.is_none() {
            warnings.push(ImportError::PartialData("total time unknown".to_string()));
        }
        if draft.nutrition.is_empty() {
            warnings.push(ImportError::PartialData("no nutrition figures".to_string()));
        }

        let complexity = draft.complexity.unwrap_or_else(|| {
            ComplexityScorer::score(draft.ingredients.len(), draft.instructions.len())
        });
        let record = RecipeRecord {
            title: draft.title,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            source: draft.source,
            source_url: draft.source_url,
            date_scraped: scraped_at.trunc_subsecs(3),
            complexity,
            metadata: draft.metadata,
            nutrition: draft.nutrition,
            image_url: draft.image_url,
            tags: draft.tags,
            raw_content: draft.raw_content,
        };

        Ok(ImportOutcome {
            recipe: CanonicalRecipe::from_record(record),
            warnings,
        })
    }

    /// Every stage after extraction
    pub fn complete(
        &self,
        draft: RecipeDraft,
        api: Option<&NutritionFigures>,
    ) -> Result<ImportOutcome, ImportError> {
        let draft = self.resolve_metadata(draft);
        let draft = self.normalize_nutrition(draft, api);
        let draft = self.score_complexity(draft);
        let draft = self.generate_tags(draft);
        let outcome = self.finalize(draft, Utc::now())?;
        for warning in &outcome.warnings {
            warn!("{}: {}", outcome.recipe.identity_key(), warning);
        }
        Ok(outcome)
    }

    pub fn process_block(&self, block: &RawBlock) -> Result<ImportOutcome, ImportError> {
        let draft = self.draft_from_block(block)?;
        self.complete(draft, None)
    }

    pub fn process_page(&self, url: &str, html: &str) -> Result<ImportOutcome, ImportError> {
        let draft = self.draft_from_page(url, html)?;
        self.complete(draft, None)
    }

    /// Segment a blob and run every block, without nutrition lookups
    pub fn process_text(&self, blob: &str) -> ImportReport {
        let segmenter = Segmenter::new(blob);
        let mut report = ImportReport::default();
        for (index, block) in segmenter.blocks().enumerate() {
            match self.process_block(&block) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => report.push_failure(index, err),
            }
        }
        info!(
            "Imported {} recipes, skipped {} blocks",
            report.outcomes.len(),
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Complexity, Macro, NutritionBasis};
    use chrono::TimeZone;

    fn pipeline() -> Pipeline {
        Pipeline::new(SiteRegistry::builtin().unwrap())
    }

    const POST: &str = "Vegetarian Pasta Salad 🍅🥑
Ingredients:
- 8 oz rotini pasta
- 1 cup cherry tomatoes
- 1 avocado, diced
- 1/4 cup olive oil
Instructions:
1. Cook the pasta and let it cool.
2. Toss everything together.
Servings: 4
https://www.facebook.com/groups/recipes/posts/123";

    #[test]
    fn test_text_block_end_to_end() {
        let outcome = pipeline().process_block(&RawBlock::new(POST)).unwrap();
        let record = outcome.recipe.record();

        assert_eq!(record.title, "Vegetarian Pasta Salad");
        assert_eq!(record.ingredients.len(), 4);
        assert_eq!(record.instructions[0], "Cook the pasta and let it cool.");
        assert_eq!(record.metadata.servings, Some(4));
        assert_eq!(record.source, "Facebook");
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://www.facebook.com/groups/recipes/posts/123")
        );
        assert_eq!(record.complexity, Complexity::Easy);
        assert!(record.tags.contains("facebook"));
        assert!(record.tags.contains("vegetarian"));
        assert!(record.tags.contains("side-dish"));
        assert_eq!(
            outcome.recipe.identity_key(),
            "vegetarian-pasta-salad::facebook"
        );
    }

    #[test]
    fn test_block_label_sets_source_and_tag() {
        let block = RawBlock::new(POST).with_source("Instagram", None);
        let outcome = pipeline().process_block(&block).unwrap();
        assert_eq!(outcome.recipe.record().source, "Instagram");
        assert!(outcome.recipe.tags().contains("instagram"));
        assert!(!outcome.recipe.tags().contains("facebook"));
    }

    #[test]
    fn test_api_figures_fill_nutrition() {
        let pipeline = pipeline();
        let draft = pipeline.draft_from_block(&RawBlock::new(POST)).unwrap();
        let api = NutritionFigures {
            values: crate::model::MacroValues {
                calories: Some(1600.0),
                carbs: Some(180.0),
                ..Default::default()
            },
            basis: NutritionBasis::Total,
        };
        let outcome = pipeline.complete(draft, Some(&api)).unwrap();
        let nutrition = &outcome.recipe.record().nutrition;

        assert_eq!(nutrition.raw.get(Macro::Calories), Some(1600.0));
        assert_eq!(nutrition.per_serving.get(Macro::Calories), Some(400.0));
        // a salad is a side: one serving is 1/2.5 of a meal
        assert_eq!(nutrition.per_meal.get(Macro::Calories), Some(1000.0));
        assert!(!outcome.recipe.tags().contains("low-carb"));
    }

    #[test]
    fn test_finalize_truncates_to_millis() {
        let pipeline = pipeline();
        let draft = pipeline.draft_from_block(&RawBlock::new(POST)).unwrap();
        let at = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let outcome = pipeline.finalize(draft, at).unwrap();
        assert_eq!(
            outcome.recipe.record().date_scraped,
            Utc.timestamp_nanos(1_700_000_000_123_000_000)
        );
    }

    #[test]
    fn test_raw_content_is_capped() {
        let long = format!("{}\n{}", POST, "word ".repeat(2000));
        let draft = pipeline().draft_from_block(&RawBlock::new(long)).unwrap();
        assert_eq!(draft.raw_content.chars().count(), 5000);
    }

    #[test]
    fn test_batch_continues_past_bad_blocks() {
        let blob = format!(
            "{}\n\n----------\n\nJust a note\nabout nothing in particular\n\n----------\n\n{}",
            POST,
            POST.replace("Vegetarian Pasta Salad", "Pesto Pasta Salad")
        );
        let report = pipeline().process_text(&blob);

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(
            report.failures[0].error,
            ImportError::MalformedInput(_)
        ));
    }

    #[test]
    fn test_oversized_prep_time_is_dropped() {
        let post = "Sourdough Starter\nPrep Time: 5000000000 minutes\nCook Time: 10 minutes\nIngredients:\n1 cup flour\n1 cup water\nInstructions:\nStir and leave on the counter.";
        let outcome = pipeline().process_block(&RawBlock::new(post)).unwrap();
        let metadata = &outcome.recipe.record().metadata;
        assert_eq!(metadata.prep_time, None);
        assert_eq!(metadata.cook_time, Some(10));
        assert_eq!(metadata.total_time, None);
    }

    #[test]
    fn test_missing_data_becomes_warnings() {
        let post = "Quick Toast\nIngredients:\nbread\nbutter\nDirections:\nToast the bread.";
        let outcome = pipeline().process_block(&RawBlock::new(post)).unwrap();
        assert!(outcome
            .warnings
            .iter()
            .all(|w| matches!(w, ImportError::PartialData(_))));
        assert_eq!(outcome.warnings.len(), 3);
        assert_eq!(outcome.recipe.record().metadata.servings, None);
    }
}
