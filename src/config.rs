use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::sites::SiteSelectors;

/// Main scraper configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Source name recorded for text imports
    #[serde(default = "default_source_label")]
    pub source_label: String,
    /// Tag every text import carries
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
    /// Upper bound on tags per recipe
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    /// Characters of source text kept in `raw_content`
    #[serde(default = "default_raw_content_limit")]
    pub raw_content_limit: usize,
    /// Replace stored fields instead of only filling gaps
    #[serde(default)]
    pub force: bool,
    /// Extra or overriding per-site selector groups
    #[serde(default)]
    pub sites: Vec<SiteSelectors>,
    #[serde(default)]
    pub nutrition: NutritionConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Configuration for the nutrition lookup service
#[derive(Debug, Deserialize, Clone)]
pub struct NutritionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_nutrition_base_url")]
    pub base_url: String,
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_nutrition_base_url(),
            app_id: None,
            app_key: None,
            timeout: default_timeout(),
        }
    }
}

impl NutritionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Credentials, when the service is enabled and both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.enabled {
            return None;
        }
        match (self.app_id.as_deref(), self.app_key.as_deref()) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => Some((id, key)),
            _ => None,
        }
    }
}

/// Configuration for page fetching
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source_label: default_source_label(),
            source_tag: default_source_tag(),
            max_tags: default_max_tags(),
            raw_content_limit: default_raw_content_limit(),
            force: false,
            sites: Vec::new(),
            nutrition: NutritionConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

// Default value functions
fn default_source_label() -> String {
    "Facebook".to_string()
}

fn default_source_tag() -> String {
    "facebook".to_string()
}

fn default_max_tags() -> usize {
    crate::tags::DEFAULT_MAX_TAGS
}

fn default_raw_content_limit() -> usize {
    5000
}

fn default_nutrition_base_url() -> String {
    "https://api.edamam.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ScraperConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_SCRAPER__ prefix
    /// 2. recipe_scraper.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_SCRAPER__NUTRITION__APP_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<ScraperConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("recipe_scraper").required(false))
        // Use double underscore for nested: RECIPE_SCRAPER__NUTRITION__APP_ID
        .add_source(
            Environment::with_prefix("RECIPE_SCRAPER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
