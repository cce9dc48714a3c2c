use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::error::ImportError;
use crate::fetch::{HtmlFetcher, RequestFetcher};
use crate::identity::IdentityResolver;
use crate::model::{Macro, RecipeDraft};
use crate::nutrition::{EdamamClient, NutritionLookup};
use crate::pipeline::{ImportOutcome, ImportReport, Pipeline};
use crate::segmenter::Segmenter;
use crate::store::{MemoryStore, RecipeStore};

/// Represents the input source for a recipe import
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Fetch and parse a recipe page
    Url(String),
    /// Segment and parse a blob of posts
    Text(String),
}

impl InputSource {
    /// Anything that parses as an http(s) URL is fetched; everything else is text
    pub fn detect(input: impl Into<String>) -> Self {
        let input = input.into();
        match url::Url::parse(input.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                InputSource::Url(input.trim().to_string())
            }
            _ => InputSource::Text(input),
        }
    }
}

/// Runs the pipeline between the fetcher, the nutrition service and the store
pub struct RecipeImporter {
    pipeline: Pipeline,
    fetcher: Box<dyn HtmlFetcher>,
    nutrition: Option<Box<dyn NutritionLookup>>,
    resolver: IdentityResolver<dyn RecipeStore>,
    force: bool,
}

impl RecipeImporter {
    /// Creates a new builder for importing recipes
    ///
    /// # Example
    /// ```
    /// use recipe_scraper::RecipeImporter;
    ///
    /// let builder = RecipeImporter::builder();
    /// ```
    pub fn builder() -> RecipeImporterBuilder {
        RecipeImporterBuilder::default()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<dyn RecipeStore> {
        self.resolver.store()
    }

    pub async fn import(&self, source: InputSource) -> Result<ImportReport, ImportError> {
        match source {
            InputSource::Text(text) => Ok(self.import_text(&text).await),
            InputSource::Url(url) => {
                let outcome = self.import_url(&url).await?;
                Ok(ImportReport {
                    outcomes: vec![outcome],
                    failures: Vec::new(),
                })
            }
        }
    }

    /// Every block of the blob; failed blocks are reported, not fatal
    pub async fn import_text(&self, blob: &str) -> ImportReport {
        let segmenter = Segmenter::new(blob);
        let mut report = ImportReport::default();

        for (index, block) in segmenter.blocks().enumerate() {
            let result = match self.pipeline.draft_from_block(&block) {
                Ok(draft) => self.finish(draft).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => report.push_failure(index, err),
            }
        }

        info!(
            "Imported {} recipes from text ({} blocks skipped, {} warnings)",
            report.outcomes.len(),
            report.failures.len(),
            report.warning_count()
        );
        report
    }

    pub async fn import_url(&self, url: &str) -> Result<ImportOutcome, ImportError> {
        let page = self.fetcher.fetch(url).await?;
        debug!("Fetched {} ({} bytes)", url, page.html.len());
        self.import_html(url, &page.html).await
    }

    /// Already-fetched page content
    pub async fn import_html(&self, url: &str, html: &str) -> Result<ImportOutcome, ImportError> {
        let draft = self.pipeline.draft_from_page(url, html)?;
        let outcome = self.finish(draft).await?;
        info!("Imported '{}' from {}", outcome.recipe.title(), url);
        Ok(outcome)
    }

    /// Nutrition lookup, the sync stages, then merge-on-upsert
    async fn finish(&self, draft: RecipeDraft) -> Result<ImportOutcome, ImportError> {
        let mut warnings = Vec::new();

        let explicit_complete = draft.hints.nutrition.values.len() == Macro::ALL.len();
        let api = match &self.nutrition {
            Some(lookup) if !explicit_complete => {
                let figures = lookup.lookup(&draft.ingredients).await;
                if figures.is_none() {
                    warnings.push(ImportError::ExternalUnavailable(format!(
                        "no nutrition data for '{}'",
                        draft.title
                    )));
                }
                figures
            }
            _ => None,
        };

        let outcome = self.pipeline.complete(draft, api.as_ref())?;
        warnings.extend(outcome.warnings);

        let resolved = self.resolver.resolve(outcome.recipe, self.force).await?;
        warnings.extend(resolved.warnings);
        if !resolved.created {
            debug!("Updated existing {}", resolved.recipe.identity_key());
        }

        Ok(ImportOutcome {
            recipe: resolved.recipe,
            warnings,
        })
    }
}

/// Builder for configuring a [`RecipeImporter`]
#[derive(Default)]
pub struct RecipeImporterBuilder {
    config: Option<ScraperConfig>,
    store: Option<Arc<dyn RecipeStore>>,
    fetcher: Option<Box<dyn HtmlFetcher>>,
    nutrition: Option<Box<dyn NutritionLookup>>,
    force: Option<bool>,
    timeout: Option<Duration>,
}

impl RecipeImporterBuilder {
    /// Use a loaded configuration instead of the defaults
    pub fn config(mut self, config: ScraperConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Where canonical recipes are merged and kept; in memory by default
    ///
    /// # Example
    /// ```
    /// use recipe_scraper::{JsonFileStore, RecipeImporter};
    /// use std::sync::Arc;
    ///
    /// let builder = RecipeImporter::builder()
    ///     .store(Arc::new(JsonFileStore::new("recipes.json")));
    /// ```
    pub fn store(mut self, store: Arc<dyn RecipeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: impl HtmlFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Overrides the service built from the `[nutrition]` configuration
    pub fn nutrition_lookup(mut self, lookup: impl NutritionLookup + 'static) -> Self {
        self.nutrition = Some(Box::new(lookup));
        self
    }

    /// Let new values replace stored ones instead of only filling gaps
    pub fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    /// Set a timeout for page fetches
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// # Errors
    /// Returns `ImportError` if:
    /// - the site registry cannot be loaded
    /// - nutrition lookups are enabled without credentials
    /// - an HTTP client cannot be created
    pub fn build(self) -> Result<RecipeImporter, ImportError> {
        let config = self.config.unwrap_or_default();
        let pipeline = Pipeline::from_config(&config)?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Box::new(RequestFetcher::new(
                Some(self.timeout.unwrap_or_else(|| config.fetch.timeout())),
                config.fetch.user_agent.as_deref(),
            )?),
        };

        let nutrition = match self.nutrition {
            Some(lookup) => Some(lookup),
            None => match config.nutrition.credentials() {
                Some((app_id, app_key)) => Some(Box::new(EdamamClient::with_base_url(
                    app_id,
                    app_key,
                    config.nutrition.base_url.as_str(),
                    config.nutrition.timeout(),
                )?) as Box<dyn NutritionLookup>),
                None if config.nutrition.enabled => {
                    return Err(ImportError::BuilderError(
                        "nutrition lookup is enabled but app_id/app_key are missing".to_string(),
                    ));
                }
                None => None,
            },
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn RecipeStore>);

        Ok(RecipeImporter {
            pipeline,
            fetcher,
            nutrition,
            resolver: IdentityResolver::new(store),
            force: self.force.unwrap_or(config.force),
        })
    }
}
