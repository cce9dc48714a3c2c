//! Case-insensitive, word-boundary term matching with an optional plural
//! suffix. Every vocabulary in the crate is built on this.

use regex::Regex;

#[derive(Debug)]
pub struct Lexicon {
    pattern: Regex,
}

impl Lexicon {
    /// Panics on an empty term list; lexicons are static vocabularies.
    pub fn new(terms: &[&str]) -> Self {
        let mut sorted: Vec<&str> = terms.to_vec();
        // longest first so "ground beef" wins over "beef"
        sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let alternation = sorted
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b({alternation})(?:s|es)?\b")).unwrap();
        Lexicon { pattern }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Matched terms, lowercased, in order of appearance, without repeats
    pub fn matches(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for caps in self.pattern.captures_iter(text) {
            let term = caps[1].to_lowercase();
            if !found.contains(&term) {
                found.push(term);
            }
        }
        found
    }

    /// `text` with every match blanked out
    pub fn remove(&self, text: &str) -> String {
        self.pattern.replace_all(text, " ").into_owned()
    }

    /// First matched term, lowercased
    pub fn first(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .map(|caps| caps[1].to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_boundaries_and_plurals() {
        let lexicon = Lexicon::new(&["egg", "ham", "anchovy", "tomato"]);
        assert!(lexicon.is_match("2 large Eggs"));
        assert!(lexicon.is_match("3 tomatoes"));
        assert!(!lexicon.is_match("eggplant"));
        assert!(!lexicon.is_match("shampoo"));
        assert!(!lexicon.is_match("graham crackers"));
    }

    #[test]
    fn test_longest_term_reported() {
        let lexicon = Lexicon::new(&["beef", "ground beef", "rice"]);
        assert_eq!(
            lexicon.matches("1 lb ground beef over rice, more rice"),
            vec!["ground beef", "rice"]
        );
        assert_eq!(lexicon.first("Rice bowls"), Some("rice".to_string()));
    }

    #[test]
    fn test_remove_blanks_matches() {
        let lexicon = Lexicon::new(&["almond milk", "peanut butter"]);
        assert_eq!(lexicon.remove("1 cup Almond Milk, 2 tbsp butter"), "1 cup  , 2 tbsp butter");
    }
}
