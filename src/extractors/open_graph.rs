use super::clean::decode_html_symbols;
use super::{ExtractedFields, Extractor, ParsingContext};
use log::debug;
use scraper::Selector;
use std::sync::LazyLock;

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

/// Title and hero image from `og:` / `twitter:` meta tags
pub struct OpenGraphExtractor;

impl OpenGraphExtractor {
    fn meta_content(context: &ParsingContext, keys: &[&str]) -> Option<String> {
        for key in keys {
            let found = context.document.select(&META).find_map(|el| {
                let attr = el
                    .value()
                    .attr("property")
                    .or_else(|| el.value().attr("name"))?;
                if attr.eq_ignore_ascii_case(key) {
                    el.value().attr("content")
                } else {
                    None
                }
            });
            if let Some(content) = found.map(decode_html_symbols) {
                let content = content.trim().to_string();
                if !content.is_empty() {
                    return Some(content);
                }
            }
        }
        None
    }
}

impl Extractor for OpenGraphExtractor {
    fn name(&self) -> &'static str {
        "OpenGraphExtractor"
    }

    fn try_extract(&self, context: &ParsingContext) -> ExtractedFields {
        let title = Self::meta_content(context, &["og:title", "twitter:title"]);
        let image_url = Self::meta_content(
            context,
            &["og:image", "og:image:url", "og:image:secure_url", "twitter:image"],
        );
        let source_url = Self::meta_content(context, &["og:url"]);
        debug!(
            "OpenGraphExtractor: title={:?} image={:?}",
            title, image_url
        );

        ExtractedFields {
            title,
            image_url,
            source_url,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_og_and_twitter_tags() {
        let html = r#"<html><head>
            <meta property="og:title" content="One-Pot Chili &amp; Beans">
            <meta name="twitter:image" content="https://img.example.com/chili.jpg">
            <meta property="og:url" content="https://www.foodnetwork.com/recipes/chili">
        </head><body></body></html>"#;
        let context = ParsingContext::new("https://www.foodnetwork.com/recipes/chili", html);
        let fields = OpenGraphExtractor.try_extract(&context);

        assert_eq!(fields.title.as_deref(), Some("One-Pot Chili & Beans"));
        assert_eq!(
            fields.image_url.as_deref(),
            Some("https://img.example.com/chili.jpg")
        );
        assert_eq!(
            fields.source_url.as_deref(),
            Some("https://www.foodnetwork.com/recipes/chili")
        );
        assert!(fields.ingredients.is_empty());
    }

    #[test]
    fn test_empty_content_is_ignored() {
        let html = r#"<html><head><meta property="og:title" content="  "></head></html>"#;
        let context = ParsingContext::new("https://example.com", html);
        assert!(OpenGraphExtractor.try_extract(&context).title.is_none());
    }
}
