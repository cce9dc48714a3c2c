use super::clean::{clean_line, strip_bullet, strip_step_number};
use super::text::{capture_metadata, capture_nutrition};
use super::{ExtractedFields, Extractor, ParsingContext};
use crate::sites::{SiteRegistry, SiteSelectors};
use log::debug;
use scraper::{ElementRef, Html, Selector};

/// Per-site CSS selector groups, falling back to common recipe-card markup
pub struct SiteSelectorExtractor {
    registry: SiteRegistry,
}

fn element_text(el: &ElementRef) -> String {
    clean_line(&el.text().collect::<Vec<_>>().join(" "))
}

fn parse_selectors(group: &[String]) -> impl Iterator<Item = (&str, Selector)> {
    group.iter().filter_map(|raw| match Selector::parse(raw) {
        Ok(selector) => Some((raw.as_str(), selector)),
        Err(e) => {
            debug!("SiteSelectorExtractor: Skipping invalid selector {}: {:?}", raw, e);
            None
        }
    })
}

/// Text of the first element matched by the first selector with content
fn first_text(document: &Html, group: &[String]) -> Option<String> {
    for (raw, selector) in parse_selectors(group) {
        let found = document
            .select(&selector)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty());
        if found.is_some() {
            debug!("SiteSelectorExtractor: matched {}", raw);
            return found;
        }
    }
    None
}

/// Texts of every element matched by the first selector with content
fn all_texts(document: &Html, group: &[String]) -> Vec<String> {
    for (raw, selector) in parse_selectors(group) {
        let items: Vec<String> = document
            .select(&selector)
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
            .collect();
        if !items.is_empty() {
            debug!(
                "SiteSelectorExtractor: Found {} items using {}",
                items.len(),
                raw
            );
            return items;
        }
    }
    Vec::new()
}

fn image_url(document: &Html, group: &[String]) -> Option<String> {
    for (_, selector) in parse_selectors(group) {
        for el in document.select(&selector) {
            let value = el.value();
            let url = value
                .attr("src")
                .or_else(|| value.attr("data-src"))
                .or_else(|| value.attr("data-lazy-src"))
                .or_else(|| value.attr("content"))
                .map(str::trim)
                .filter(|u| u.starts_with("http"));
            if let Some(url) = url {
                return Some(url.to_string());
            }
        }
    }
    None
}

impl SiteSelectorExtractor {
    pub fn new(registry: SiteRegistry) -> Self {
        SiteSelectorExtractor { registry }
    }

    fn extract_with(&self, document: &Html, site: &SiteSelectors) -> ExtractedFields {
        let mut fields = ExtractedFields {
            title: first_text(document, &site.title),
            ingredients: all_texts(document, &site.ingredients)
                .iter()
                .map(|i| strip_bullet(i))
                .filter(|i| !i.is_empty())
                .collect(),
            instructions: all_texts(document, &site.instructions)
                .iter()
                .map(|i| strip_step_number(i))
                .filter(|i| !i.is_empty())
                .collect(),
            image_url: image_url(document, &site.image),
            ..Default::default()
        };

        let meta = &mut fields.metadata;
        meta.prep_time = first_text(document, &site.prep_time);
        meta.cook_time = first_text(document, &site.cook_time);
        meta.total_time = first_text(document, &site.total_time);
        meta.servings = first_text(document, &site.servings);
        for row in all_texts(document, &site.details) {
            capture_metadata(meta, &row);
        }

        for row in all_texts(document, &site.nutrition) {
            capture_nutrition(&mut fields.nutrition, &row);
        }

        fields
    }
}

impl Extractor for SiteSelectorExtractor {
    fn name(&self) -> &'static str {
        "SiteSelectorExtractor"
    }

    fn try_extract(&self, context: &ParsingContext) -> ExtractedFields {
        let mut fields = match self.registry.lookup(&context.url) {
            Some(site) => {
                debug!("SiteSelectorExtractor: using {} selectors", site.name);
                self.extract_with(&context.document, site)
            }
            None => ExtractedFields::default(),
        };
        if !fields.is_complete() {
            debug!("SiteSelectorExtractor: trying recipe-card markup");
            fields.fill_from(self.extract_with(&context.document, self.registry.generic()));
        }
        fields
    }
}
