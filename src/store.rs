//! Persistence collaborators for canonical recipes.

use async_trait::async_trait;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use crate::error::ImportError;
use crate::model::{CanonicalRecipe, RecipeRecord};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn find_by_identity_key(&self, key: &str)
        -> Result<Option<CanonicalRecipe>, ImportError>;

    /// Insert, or replace the record with the same identity key. Without
    /// `force` an identical stored record is left untouched.
    async fn upsert(
        &self,
        recipe: CanonicalRecipe,
        force: bool,
    ) -> Result<CanonicalRecipe, ImportError>;

    async fn all(&self) -> Result<Vec<CanonicalRecipe>, ImportError>;
}

/// Process-local store keyed by identity key
#[derive(Debug, Default)]
pub struct MemoryStore {
    recipes: RwLock<BTreeMap<String, CanonicalRecipe>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_by_identity_key(
        &self,
        key: &str,
    ) -> Result<Option<CanonicalRecipe>, ImportError> {
        Ok(self.recipes.read().await.get(key).cloned())
    }

    async fn upsert(
        &self,
        recipe: CanonicalRecipe,
        force: bool,
    ) -> Result<CanonicalRecipe, ImportError> {
        let mut recipes = self.recipes.write().await;
        if !force && recipes.get(recipe.identity_key()) == Some(&recipe) {
            return Ok(recipe);
        }
        recipes.insert(recipe.identity_key().to_string(), recipe.clone());
        Ok(recipe)
    }

    async fn all(&self) -> Result<Vec<CanonicalRecipe>, ImportError> {
        Ok(self.recipes.read().await.values().cloned().collect())
    }
}

/// A JSON array of records on disk, rewritten on every change
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<CanonicalRecipe>, ImportError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("JsonFileStore: {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<RecipeRecord> = serde_json::from_str(&json)?;
        Ok(records
            .into_iter()
            .map(CanonicalRecipe::from_record)
            .collect())
    }

    async fn save(&self, recipes: &[CanonicalRecipe]) -> Result<(), ImportError> {
        let records: Vec<&RecipeRecord> = recipes.iter().map(CanonicalRecipe::record).collect();
        let json = serde_json::to_string_pretty(&records)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for JsonFileStore {
    async fn find_by_identity_key(
        &self,
        key: &str,
    ) -> Result<Option<CanonicalRecipe>, ImportError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.identity_key() == key))
    }

    async fn upsert(
        &self,
        recipe: CanonicalRecipe,
        force: bool,
    ) -> Result<CanonicalRecipe, ImportError> {
        let _guard = self.write_lock.lock().await;
        let mut recipes = self.load().await?;

        match recipes
            .iter_mut()
            .find(|r| r.identity_key() == recipe.identity_key())
        {
            Some(stored) if !force && *stored == recipe => {
                debug!("JsonFileStore: {} unchanged", recipe.identity_key());
                return Ok(recipe);
            }
            Some(stored) => *stored = recipe.clone(),
            None => recipes.push(recipe.clone()),
        }

        self.save(&recipes).await?;
        info!(
            "Saved {} recipes to {}",
            recipes.len(),
            self.path.display()
        );
        Ok(recipe)
    }

    async fn all(&self) -> Result<Vec<CanonicalRecipe>, ImportError> {
        self.load().await
    }
}
