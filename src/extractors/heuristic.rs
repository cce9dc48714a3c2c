use super::clean::clean_line;
use super::text::TextExtractor;
use super::{ExtractedFields, Extractor, ParsingContext};
use log::debug;
use scraper::Selector;
use std::sync::LazyLock;

static BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p, li").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

/// Last resort: the page's block-level text read like a text post
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    /// One line per block element, nested blocks not repeated
    fn page_lines(context: &ParsingContext) -> Vec<String> {
        context
            .document
            .select(&BLOCKS)
            .filter(|el| {
                // an <li> holding a <p> is read through the <p>
                !el.select(&BLOCKS).any(|inner| inner.id() != el.id())
            })
            .map(|el| clean_line(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|line| !line.is_empty())
            .collect()
    }
}

impl Extractor for HeuristicExtractor {
    fn name(&self) -> &'static str {
        "HeuristicExtractor"
    }

    fn try_extract(&self, context: &ParsingContext) -> ExtractedFields {
        let lines = Self::page_lines(context);
        debug!("HeuristicExtractor: scanning {} block lines", lines.len());

        let title = context
            .document
            .select(&H1)
            .map(|el| clean_line(&el.text().collect::<Vec<_>>().join(" ")))
            .find(|t| !t.is_empty());

        let mut fields = TextExtractor::extract(&lines.join("\n"));
        fields.title = title;
        // links in page text are not the page's own address
        fields.source_url = None;
        fields
    }
}
