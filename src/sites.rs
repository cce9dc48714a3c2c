use config::{Config, File, FileFormat};
use log::debug;
use serde::Deserialize;
use url::Url;

use crate::error::ImportError;

const BUILTIN_SITES: &str = include_str!("sites.toml");

/// CSS selector groups for one recipe site
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SiteSelectors {
    /// Registrable domain, without "www."; empty for the generic group
    #[serde(default)]
    pub domain: String,
    /// Display name used as the record's `source`
    pub name: String,
    /// Source tag added to every record from this site
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub prep_time: Vec<String>,
    #[serde(default)]
    pub cook_time: Vec<String>,
    #[serde(default)]
    pub total_time: Vec<String>,
    #[serde(default)]
    pub servings: Vec<String>,
    /// Rows read as "Label: value" metadata lines
    #[serde(default)]
    pub details: Vec<String>,
    /// Rows read as nutrition lines
    #[serde(default)]
    pub nutrition: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SitesFile {
    generic: SiteSelectors,
    #[serde(default)]
    site: Vec<SiteSelectors>,
}

/// Where a web import came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    pub name: String,
    pub tag: String,
}

/// Domain to selector lookup. The built-in table can be extended or
/// overridden per domain.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    generic: SiteSelectors,
    sites: Vec<SiteSelectors>,
}

impl SiteRegistry {
    pub fn builtin() -> Result<Self, ImportError> {
        let file: SitesFile = Config::builder()
            .add_source(File::from_str(BUILTIN_SITES, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        debug!("SiteRegistry: loaded {} built-in sites", file.site.len());
        Ok(SiteRegistry {
            generic: file.generic,
            sites: file.site,
        })
    }

    /// Add sites, replacing built-in entries with the same domain
    pub fn with_sites(mut self, extra: Vec<SiteSelectors>) -> Self {
        for site in extra {
            let domain = normalize_host(&site.domain);
            if domain.is_empty() {
                continue;
            }
            self.sites.retain(|s| s.domain != domain);
            self.sites.push(SiteSelectors { domain, ..site });
        }
        self
    }

    pub fn generic(&self) -> &SiteSelectors {
        &self.generic
    }

    pub fn sites(&self) -> &[SiteSelectors] {
        &self.sites
    }

    /// Exact host match first, then the closest parent domain
    pub fn lookup(&self, url: &str) -> Option<&SiteSelectors> {
        let host = host_of(url)?;
        self.sites
            .iter()
            .filter(|s| host == s.domain || host.ends_with(&format!(".{}", s.domain)))
            .max_by_key(|s| s.domain.len())
    }

    pub fn source_for(&self, url: &str) -> SourceName {
        if let Some(site) = self.lookup(url) {
            return SourceName {
                name: site.name.clone(),
                tag: site.tag.clone(),
            };
        }
        let host = host_of(url).unwrap_or_default();
        let labels: Vec<&str> = host.split('.').collect();
        let tag = match labels.len() {
            0 | 1 => host.clone(),
            n => labels[n - 2].to_string(),
        };
        SourceName {
            name: host.clone(),
            tag: tag
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase(),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(normalize_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = SiteRegistry::builtin().unwrap();
        assert_eq!(registry.sites().len(), 10);
        assert!(!registry.generic().ingredients.is_empty());
    }

    #[test]
    fn test_lookup_strips_www_and_matches_subdomains() {
        let registry = SiteRegistry::builtin().unwrap();

        let site = registry
            .lookup("https://www.simplyrecipes.com/recipes/lemon_chicken/")
            .unwrap();
        assert_eq!(site.name, "SimplyRecipes");

        let site = registry.lookup("https://uk.myprotein.com/thezone/recipes/x").unwrap();
        assert_eq!(site.tag, "myprotein");

        assert!(registry.lookup("https://notsimplyrecipes.com/a").is_none());
        assert!(registry.lookup("not a url").is_none());
    }

    #[test]
    fn test_source_for_unknown_site() {
        let registry = SiteRegistry::builtin().unwrap();
        let source = registry.source_for("https://www.budgetbytes.com/chili/");
        assert_eq!(source.name, "budgetbytes.com");
        assert_eq!(source.tag, "budgetbytes");
    }

    #[test]
    fn test_with_sites_overrides_by_domain() {
        let registry = SiteRegistry::builtin().unwrap().with_sites(vec![SiteSelectors {
            domain: "www.PinchOfYum.com".to_string(),
            name: "Pinch of Yum (custom)".to_string(),
            tag: "pinchofyum".to_string(),
            title: vec!["h1.custom".to_string()],
            ..Default::default()
        }]);

        assert_eq!(registry.sites().len(), 10);
        let site = registry.lookup("https://pinchofyum.com/soup").unwrap();
        assert_eq!(site.name, "Pinch of Yum (custom)");
    }
}
