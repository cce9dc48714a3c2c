pub mod complexity;
pub mod config;
pub mod dietary;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod identity;
pub mod importer;
pub mod lexicon;
pub mod metadata;
pub mod model;
pub mod nutrition;
pub mod pipeline;
pub mod segmenter;
pub mod sites;
pub mod store;
pub mod tags;

pub use config::ScraperConfig;
pub use error::ImportError;
pub use fetch::{FetchedPage, HtmlFetcher, RequestFetcher};
pub use importer::{InputSource, RecipeImporter, RecipeImporterBuilder};
pub use model::{CanonicalRecipe, RawBlock, RecipeRecord};
pub use nutrition::{EdamamClient, NutritionLookup};
pub use pipeline::{ImportOutcome, ImportReport, Pipeline};
pub use segmenter::Segmenter;
pub use sites::SiteRegistry;
pub use store::{JsonFileStore, MemoryStore, RecipeStore};

/// Parse a blob of recipe posts with the default configuration, without
/// nutrition lookups or persistence
pub fn parse_text(blob: &str) -> Result<ImportReport, ImportError> {
    let pipeline = Pipeline::new(SiteRegistry::builtin()?);
    Ok(pipeline.process_text(blob))
}

/// Fetch and parse one recipe page with the default configuration
pub async fn import_url(url: &str) -> Result<CanonicalRecipe, ImportError> {
    let importer = RecipeImporter::builder().build()?;
    let outcome = importer.import_url(url).await?;
    Ok(outcome.recipe)
}
