//! Splits a blob of pasted posts into one block per recipe.

use log::debug;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::RawBlock;

static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-_]{8,}\s*$").unwrap());
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3})[.)]\s+(\S.*)$").unwrap());

/// How a blob is cut into blocks. Chosen once per blob, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Lines made only of 8+ dashes or underscores
    SeparatorLines,
    /// "1. Recipe Name" header lines
    NumberedHeaders,
    /// Two or more consecutive blank lines
    BlankRuns,
    /// Nothing to split on; the whole blob is one block
    Whole,
}

/// A segmented blob. `blocks()` can be called repeatedly and always yields
/// the same finite sequence.
pub struct Segmenter<'a> {
    lines: Vec<&'a str>,
    mode: SplitMode,
    /// Line indices where a new section starts, plus separator lines to skip
    cuts: Vec<Cut>,
    source_label: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Cut {
    /// First line of the separator (or header line for numbered mode)
    at: usize,
    /// Number of lines consumed by the separator itself
    width: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let (mode, cuts) = detect_mode(&lines);
        debug!(
            "Segmenter: {} lines, mode {:?}, {} cut points",
            lines.len(),
            mode,
            cuts.len()
        );
        Segmenter {
            lines,
            mode,
            cuts,
            source_label: None,
        }
    }

    /// Label attached to every produced block (e.g. "Facebook")
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn blocks(&self) -> Blocks<'_, 'a> {
        Blocks {
            segmenter: self,
            section: 0,
        }
    }

    /// Line range `[start, end)` of section `n`, or None past the end
    fn section(&self, n: usize) -> Option<(usize, usize)> {
        if n > self.cuts.len() {
            return None;
        }
        let start = if n == 0 {
            0
        } else {
            let cut = self.cuts[n - 1];
            // numbered headers belong to the block they open
            if self.mode == SplitMode::NumberedHeaders {
                cut.at
            } else {
                cut.at + cut.width
            }
        };
        let end = self.cuts.get(n).map_or(self.lines.len(), |cut| cut.at);
        Some((start, end))
    }

    fn build_block(&self, start: usize, end: usize, opens_with_header: bool) -> Option<RawBlock> {
        let mut lines: Vec<String> = self.lines[start..end]
            .iter()
            .map(|l| l.to_string())
            .collect();

        if self.mode == SplitMode::NumberedHeaders && opens_with_header {
            if let Some(caps) = lines.first().and_then(|l| NUMBERED_LINE.captures(l)) {
                lines[0] = caps[2].trim().to_string();
            }
        }

        let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
        if non_empty < 2 {
            debug!(
                "Segmenter: discarding lines {}..{} ({} non-empty)",
                start, end, non_empty
            );
            return None;
        }

        // trim surrounding blank lines, keep interior layout
        let first = lines.iter().position(|l| !l.trim().is_empty())?;
        let last = lines.iter().rposition(|l| !l.trim().is_empty())?;

        Some(RawBlock {
            text: lines[first..=last].join("\n"),
            source_url: None,
            source_label: self.source_label.clone(),
        })
    }
}

/// Lazy iterator over the blocks of a [`Segmenter`]
pub struct Blocks<'s, 'a> {
    segmenter: &'s Segmenter<'a>,
    section: usize,
}

impl Iterator for Blocks<'_, '_> {
    type Item = RawBlock;

    fn next(&mut self) -> Option<RawBlock> {
        while let Some((start, end)) = self.segmenter.section(self.section) {
            self.section += 1;
            let opens_with_header = self.section > 1;
            if let Some(block) = self.segmenter.build_block(start, end, opens_with_header) {
                return Some(block);
            }
        }
        None
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn detect_mode(lines: &[&str]) -> (SplitMode, Vec<Cut>) {
    let separators: Vec<Cut> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| SEPARATOR_LINE.is_match(l))
        .map(|(at, _)| Cut { at, width: 1 })
        .collect();
    if !separators.is_empty() {
        return (SplitMode::SeparatorLines, separators);
    }

    let headers = numbered_headers(lines);
    if headers.len() >= 2 {
        return (SplitMode::NumberedHeaders, headers);
    }

    let blank_runs = blank_runs(lines);
    if !blank_runs.is_empty() {
        return (SplitMode::BlankRuns, blank_runs);
    }

    (SplitMode::Whole, Vec::new())
}

/// Header lines continue the sequence 1, 2, 3... start the blob or follow a
/// blank line, and are not followed directly by another numbered line
/// (that would be a list of steps).
fn numbered_headers(lines: &[&str]) -> Vec<Cut> {
    let mut cuts = Vec::new();
    let mut expected = 1u32;

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = NUMBERED_LINE.captures(line) else {
            continue;
        };
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        if number != expected {
            continue;
        }
        let after_break = i == 0 || is_blank(lines[i - 1]);
        let next_is_numbered = lines
            .get(i + 1)
            .is_some_and(|next| NUMBERED_LINE.is_match(next));
        let next_is_content = lines.get(i + 1).is_some_and(|next| !is_blank(next));

        if after_break && next_is_content && !next_is_numbered {
            cuts.push(Cut { at: i, width: 1 });
            expected += 1;
        }
    }

    cuts
}

fn blank_runs(lines: &[&str]) -> Vec<Cut> {
    let mut cuts = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if is_blank(lines[i]) {
            let start = i;
            while i < lines.len() && is_blank(lines[i]) {
                i += 1;
            }
            if i - start >= 2 {
                cuts.push(Cut {
                    at: start,
                    width: i - start,
                });
            }
        } else {
            i += 1;
        }
    }
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_POSTS: &str = "Creamy Tomato Soup\nIngredients\n2 cans tomatoes\n1 cup cream\nDirections\nSimmer everything for 20 minutes.\n----------\nLemon Bars\nIngredients\n1 cup flour\n2 lemons\nDirections\nBake for 25 minutes.";

    #[test]
    fn test_separator_lines_split() {
        let segmenter = Segmenter::new(TWO_POSTS);
        assert_eq!(segmenter.mode(), SplitMode::SeparatorLines);

        let blocks: Vec<_> = segmenter.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.starts_with("Creamy Tomato Soup"));
        assert!(blocks[1].text.starts_with("Lemon Bars"));
        assert!(!blocks[0].text.contains("----"));
    }

    #[test]
    fn test_short_dash_runs_are_not_separators() {
        let text = "Salsa\nIngredients\n- 3 tomatoes\n-----\n- 1 onion\nDirections\nChop and mix.";
        let segmenter = Segmenter::new(text);
        assert_eq!(segmenter.mode(), SplitMode::Whole);
        assert_eq!(segmenter.blocks().count(), 1);
    }

    #[test]
    fn test_separator_with_trailing_content_is_not_a_separator() {
        let text = "Salsa\n---------- see below\nChop and mix.";
        assert_eq!(Segmenter::new(text).mode(), SplitMode::Whole);
    }

    #[test]
    fn test_numbered_headers_split_but_steps_do_not() {
        let text = "1. Banana Pancakes\nIngredients\n2 bananas\n2 eggs\nInstructions\n1. Mash the bananas.\n2. Whisk in the eggs.\n3. Fry small rounds.\n\n2. Overnight Oats\nIngredients\n1/2 cup oats\n1/2 cup milk\nInstructions\n1. Stir together and chill overnight.";

        let segmenter = Segmenter::new(text);
        assert_eq!(segmenter.mode(), SplitMode::NumberedHeaders);

        let blocks: Vec<_> = segmenter.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.starts_with("Banana Pancakes\n"));
        assert!(blocks[0].text.contains("3. Fry small rounds."));
        assert!(blocks[1].text.starts_with("Overnight Oats\n"));
    }

    #[test]
    fn test_blank_runs_split_and_single_blank_does_not() {
        let text = "Guacamole\nIngredients\n2 avocados\n\n1 lime\nDirections\nMash.\n\n\nHummus\nIngredients\n1 can chickpeas\nDirections\nBlend.";
        let segmenter = Segmenter::new(text);
        assert_eq!(segmenter.mode(), SplitMode::BlankRuns);

        let blocks: Vec<_> = segmenter.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.contains("2 avocados\n\n1 lime"));
    }

    #[test]
    fn test_trivial_sections_are_discarded() {
        let text = "Intro text only\n__________\nPesto\nBlend basil and oil.\n__________\n\n__________\nlonely line";
        let blocks: Vec<_> = Segmenter::new(text).blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.starts_with("Pesto"));
    }

    #[test]
    fn test_blocks_are_restartable() {
        let segmenter = Segmenter::new(TWO_POSTS).with_source_label("Facebook");
        let first: Vec<_> = segmenter.blocks().collect();
        let second: Vec<_> = segmenter.blocks().collect();
        assert_eq!(first, second);
        assert_eq!(first[0].source_label.as_deref(), Some("Facebook"));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(Segmenter::new("").blocks().count(), 0);
        assert_eq!(Segmenter::new("\n\n\n").blocks().count(), 0);
    }
}
