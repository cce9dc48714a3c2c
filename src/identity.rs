//! Identity keys and merge-on-upsert.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ImportError;
use crate::model::{CanonicalRecipe, Metadata, Nutrition, RecipeRecord};
use crate::nutrition::NutritionNormalizer;
use crate::store::RecipeStore;

/// Lowercase, runs of non-alphanumerics to one `-`, no leading/trailing `-`
pub fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn identity_key(title: &str, source: &str) -> String {
    format!("{}::{}", slug(title), slug(source))
}

trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

impl<T> Blank for std::collections::BTreeSet<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for Nutrition {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

struct Merger {
    force: bool,
    conflicts: Vec<String>,
}

impl Merger {
    fn pick<T: Blank + PartialEq>(&mut self, field: &str, existing: T, incoming: T) -> T {
        if incoming.is_blank() || existing == incoming {
            return existing;
        }
        if existing.is_blank() || self.force {
            return incoming;
        }
        self.conflicts.push(field.to_string());
        existing
    }

    fn metadata(&mut self, existing: Metadata, incoming: Metadata) -> Metadata {
        Metadata {
            prep_time: self.pick("metadata.prep_time", existing.prep_time, incoming.prep_time),
            cook_time: self.pick("metadata.cook_time", existing.cook_time, incoming.cook_time),
            total_time: self.pick(
                "metadata.total_time",
                existing.total_time,
                incoming.total_time,
            ),
            servings: self.pick("metadata.servings", existing.servings, incoming.servings),
            cuisine: self.pick("metadata.cuisine", existing.cuisine, incoming.cuisine),
        }
    }
}

/// Result of merging a new record into a stored one
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub record: RecipeRecord,
    /// Fields where both records had differing values and the existing one was kept
    pub conflicts: Vec<String>,
}

/// Existing non-empty fields win and empty ones are filled from `incoming`;
/// with `force` the incoming non-empty fields win. `date_scraped` always
/// comes from `existing`. Nutrition views always match the merged servings.
pub fn merge(existing: RecipeRecord, incoming: RecipeRecord, force: bool) -> Merged {
    let mut merger = Merger {
        force,
        conflicts: Vec::new(),
    };

    let nutrition_from_incoming = !incoming.nutrition.is_blank()
        && existing.nutrition != incoming.nutrition
        && (existing.nutrition.is_blank() || force);
    let nutrition_servings = if nutrition_from_incoming {
        incoming.metadata.servings
    } else {
        existing.metadata.servings
    };

    let complexity = if force {
        incoming.complexity
    } else {
        if existing.complexity != incoming.complexity {
            merger.conflicts.push("complexity".to_string());
        }
        existing.complexity
    };

    let mut record = RecipeRecord {
        title: merger.pick("title", existing.title, incoming.title),
        ingredients: merger.pick("ingredients", existing.ingredients, incoming.ingredients),
        instructions: merger.pick("instructions", existing.instructions, incoming.instructions),
        source: merger.pick("source", existing.source, incoming.source),
        source_url: merger.pick("source_url", existing.source_url, incoming.source_url),
        date_scraped: existing.date_scraped,
        complexity,
        metadata: merger.metadata(existing.metadata, incoming.metadata),
        nutrition: merger.pick("nutrition", existing.nutrition, incoming.nutrition),
        image_url: merger.pick("image_url", existing.image_url, incoming.image_url),
        tags: merger.pick("tags", existing.tags, incoming.tags),
        raw_content: merger.pick("raw_content", existing.raw_content, incoming.raw_content),
    };

    if record.metadata.servings != nutrition_servings && !record.nutrition.is_empty() {
        debug!(
            "merge: rescaling nutrition from {:?} to {:?} servings",
            nutrition_servings, record.metadata.servings
        );
        record.nutrition = NutritionNormalizer::rescale(
            &record.nutrition,
            nutrition_servings,
            record.metadata.servings,
        );
    }

    Merged {
        record,
        conflicts: merger.conflicts,
    }
}

/// What persisting one recipe produced
#[derive(Debug)]
pub struct Resolved {
    pub recipe: CanonicalRecipe,
    /// True when no record with this identity key existed before
    pub created: bool,
    /// `IdentityConflict` for every field the existing record kept
    pub warnings: Vec<ImportError>,
}

/// Serializes lookup-merge-upsert per identity key
pub struct IdentityResolver<S: RecipeStore + ?Sized> {
    store: Arc<S>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: RecipeStore + ?Sized> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        IdentityResolver {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the key's lock once no other import holds or waits on it
    async fn release(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    pub async fn resolve(
        &self,
        recipe: CanonicalRecipe,
        force: bool,
    ) -> Result<Resolved, ImportError> {
        let key = recipe.identity_key().to_string();
        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.resolve_locked(&key, recipe, force).await
        };
        self.release(&key, lock).await;
        result
    }

    async fn resolve_locked(
        &self,
        key: &str,
        recipe: CanonicalRecipe,
        force: bool,
    ) -> Result<Resolved, ImportError> {
        let Some(existing) = self.store.find_by_identity_key(key).await? else {
            info!("Storing new recipe {}", key);
            let recipe = self.store.upsert(recipe, force).await?;
            return Ok(Resolved {
                recipe,
                created: true,
                warnings: Vec::new(),
            });
        };

        debug!("IdentityResolver: merging into existing {}", key);
        let merged = merge(existing.into_record(), recipe.into_record(), force);
        let warnings = merged
            .conflicts
            .into_iter()
            .map(|field| {
                warn!("Identity conflict on {}: kept existing '{}'", key, field);
                ImportError::IdentityConflict {
                    key: key.to_string(),
                    field,
                }
            })
            .collect();

        let recipe = self
            .store
            .upsert(CanonicalRecipe::from_record(merged.record), force)
            .await?;
        Ok(Resolved {
            recipe,
            created: false,
            warnings,
        })
    }
}
