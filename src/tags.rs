//! Tag generation over a resolved draft.
//!
//! Tags come from fixed vocabularies only. Free text from the source (its
//! keywords and categories) contributes a tag only when it names something
//! in those vocabularies.

use log::debug;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::dietary::DietaryReport;
use crate::lexicon::Lexicon;
use crate::metadata::canonical_cuisine;
use crate::model::{Complexity, Metadata, RawMetadata};
use crate::nutrition::DishType;

pub const DEFAULT_MAX_TAGS: usize = 20;

/// Free-text term to tag
type TagTable = &'static [(&'static str, &'static str)];

const MEAL_TYPES: TagTable = &[
    ("breakfast", "breakfast"),
    ("brunch", "breakfast"),
    ("pancake", "breakfast"),
    ("waffle", "breakfast"),
    ("omelet", "breakfast"),
    ("omelette", "breakfast"),
    ("french toast", "breakfast"),
    ("granola", "breakfast"),
    ("oatmeal", "breakfast"),
    ("overnight oats", "breakfast"),
    ("frittata", "breakfast"),
    ("smoothie", "breakfast"),
    ("lunch", "lunch"),
    ("sandwich", "lunch"),
    ("wrap", "lunch"),
    ("dinner", "dinner"),
    ("supper", "dinner"),
    ("main course", "dinner"),
    ("entree", "dinner"),
];

const DISH_TYPES: TagTable = &[
    ("soup", "soup"),
    ("chowder", "soup"),
    ("bisque", "soup"),
    ("salad", "salad"),
    ("slaw", "salad"),
    ("sandwich", "sandwich"),
    ("panini", "sandwich"),
    ("pizza", "pizza"),
    ("flatbread", "pizza"),
    ("pasta", "pasta"),
    ("spaghetti", "pasta"),
    ("lasagna", "pasta"),
    ("penne", "pasta"),
    ("mac and cheese", "pasta"),
    ("stir-fry", "stir-fry"),
    ("stir fry", "stir-fry"),
    ("casserole", "casserole"),
    ("stew", "stew"),
    ("curry", "curry"),
    ("curries", "curry"),
    ("bowl", "bowl"),
    ("wrap", "wrap"),
    ("burrito", "wrap"),
    ("burger", "burger"),
    ("taco", "taco"),
    ("pie", "pie"),
    ("quiche", "pie"),
    ("bread", "bread"),
    ("loaf", "bread"),
    ("muffin", "bread"),
    ("cake", "cake"),
    ("cupcake", "cake"),
    ("cookie", "cookie"),
    ("rice", "rice"),
    ("risotto", "rice"),
    ("fried rice", "rice"),
];

const MAIN_INGREDIENTS: TagTable = &[
    ("chicken", "chicken"),
    ("beef", "beef"),
    ("ground beef", "beef"),
    ("steak", "beef"),
    ("pork", "pork"),
    ("bacon", "pork"),
    ("sausage", "pork"),
    ("turkey", "turkey"),
    ("lamb", "lamb"),
    ("fish", "fish"),
    ("salmon", "fish"),
    ("tuna", "fish"),
    ("cod", "fish"),
    ("tilapia", "fish"),
    ("shrimp", "seafood"),
    ("prawn", "seafood"),
    ("crab", "seafood"),
    ("scallop", "seafood"),
    ("seafood", "seafood"),
    ("tofu", "tofu"),
    ("lentil", "lentils"),
    ("chickpea", "beans"),
    ("black bean", "beans"),
    ("kidney bean", "beans"),
    ("bean", "beans"),
    ("mushroom", "mushroom"),
    ("egg", "eggs"),
];

const STAPLE_TAGS: TagTable = &[
    ("rice", "rice"),
    ("pasta", "pasta"),
    ("spaghetti", "pasta"),
    ("noodle", "pasta"),
    ("potato", "potato"),
    ("sweet potato", "potato"),
    ("quinoa", "quinoa"),
];

const COOKING_METHODS: TagTable = &[
    ("bake", "baked"),
    ("baked", "baked"),
    ("baking", "baked"),
    ("roast", "roasted"),
    ("roasted", "roasted"),
    ("grill", "grilled"),
    ("grilled", "grilled"),
    ("fry", "fried"),
    ("fried", "fried"),
    ("deep-fry", "fried"),
    ("saute", "sauteed"),
    ("sauté", "sauteed"),
    ("sauteed", "sauteed"),
    ("sautéed", "sauteed"),
    ("braise", "braised"),
    ("braised", "braised"),
    ("steam", "steamed"),
    ("steamed", "steamed"),
    ("stir-fry", "stir-fry"),
    ("stir fry", "stir-fry"),
    ("slow cooker", "slow-cooker"),
    ("crock pot", "slow-cooker"),
    ("crockpot", "slow-cooker"),
    ("instant pot", "instant-pot"),
    ("pressure cooker", "pressure-cooker"),
    ("air fryer", "air-fryer"),
    ("air fry", "air-fryer"),
    ("no-bake", "no-bake"),
    ("no bake", "no-bake"),
    ("one-pot", "one-pot"),
    ("one pot", "one-pot"),
    ("sheet pan", "sheet-pan"),
    ("sheet-pan", "sheet-pan"),
];

/// Tags a source keyword may map onto directly
const KEYWORD_VOCABULARY: &[&str] = &[
    "vegetarian", "vegan", "gluten-free", "dairy-free", "keto", "low-carb", "paleo",
    "whole30", "breakfast", "lunch", "dinner", "dessert", "snack", "appetizer", "side-dish",
    "main-dish", "soup", "salad", "sandwich", "pizza", "pasta", "stir-fry", "casserole",
    "stew", "curry", "bowl", "wrap", "burger", "taco", "pie", "bread", "cake", "cookie",
    "chicken", "beef", "pork", "fish", "seafood", "tofu", "lentils", "beans", "rice",
    "potato", "mushroom", "baked", "grilled", "fried", "slow-cooker", "instant-pot",
    "air-fryer", "steamed", "sauteed", "pressure-cooker", "one-pot", "sheet-pan", "no-bake",
    "quick", "make-ahead", "meal-prep", "5-ingredients", "30-minute", "weeknight", "easy",
    "spicy", "party", "potluck", "holiday", "family-friendly",
];

static DESSERT_INGREDIENTS: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "chocolate chip",
        "powdered sugar",
        "confectioners sugar",
        "icing sugar",
        "cake mix",
        "frosting",
        "sprinkle",
    ])
});

static MEAL_TYPE_WORDS: LazyLock<Lexicon> = LazyLock::new(|| table_lexicon(MEAL_TYPES));
static DISH_TYPE_WORDS: LazyLock<Lexicon> = LazyLock::new(|| table_lexicon(DISH_TYPES));
static MAIN_INGREDIENT_WORDS: LazyLock<Lexicon> =
    LazyLock::new(|| table_lexicon(MAIN_INGREDIENTS));
static COOKING_METHOD_WORDS: LazyLock<Lexicon> =
    LazyLock::new(|| table_lexicon(COOKING_METHODS));

fn table_lexicon(table: TagTable) -> Lexicon {
    let terms: Vec<&str> = table.iter().map(|(term, _)| *term).collect();
    Lexicon::new(&terms)
}

fn lookup(table: TagTable, term: &str) -> Option<&'static str> {
    table.iter().find(|(t, _)| *t == term).map(|(_, tag)| *tag)
}

fn tags_for(lexicon: &Lexicon, table: TagTable, text: &str) -> Vec<&'static str> {
    lexicon
        .matches(text)
        .iter()
        .filter_map(|term| lookup(table, term))
        .collect()
}

fn slug_tag(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Everything a tag can be derived from
pub struct TagInput<'a> {
    pub source_tag: &'a str,
    pub title: &'a str,
    pub ingredients: &'a [String],
    pub instructions: &'a [String],
    pub metadata: &'a Metadata,
    pub raw_metadata: &'a RawMetadata,
    pub dietary: &'a DietaryReport,
    pub complexity: Complexity,
}

impl TagInput<'_> {
    fn source_labels(&self) -> String {
        self.raw_metadata
            .category
            .iter()
            .chain(&self.raw_metadata.keywords)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[derive(Debug, Clone)]
pub struct TagGenerator {
    max_tags: usize,
}

impl Default for TagGenerator {
    fn default() -> Self {
        TagGenerator::new(DEFAULT_MAX_TAGS)
    }
}

impl TagGenerator {
    /// The source tag is always kept, so the cap is at least one
    pub fn new(max_tags: usize) -> Self {
        TagGenerator {
            max_tags: max_tags.max(1),
        }
    }

    pub fn generate(&self, input: &TagInput) -> BTreeSet<String> {
        let mut ordered: Vec<String> = Vec::new();
        let mut push = |tag: &str| {
            let tag = tag.to_lowercase();
            if !tag.is_empty() && !ordered.contains(&tag) {
                ordered.push(tag);
            }
        };

        push(input.source_tag);

        for tag in input.dietary.flags.tags() {
            push(tag);
        }

        push(Self::dish_type(input).tag());
        if let Some(tag) = Self::dish_kind(input) {
            push(tag);
        }

        for tag in Self::meal_types(input) {
            push(tag);
        }

        push(input.complexity.as_str());

        for tag in Self::keyword_tags(input) {
            push(&tag);
        }

        debug!(
            "TagGenerator: {} candidate tags, keeping {}",
            ordered.len(),
            self.max_tags
        );
        ordered.into_iter().take(self.max_tags).collect()
    }

    /// Title first, then source labels, then the ingredients
    fn dish_type(input: &TagInput) -> DishType {
        DishType::from_text(input.title, false)
            .or_else(|| DishType::from_text(&input.source_labels(), true))
            .or_else(|| {
                DESSERT_INGREDIENTS
                    .is_match(&input.ingredients.join("\n"))
                    .then_some(DishType::Dessert)
            })
            .unwrap_or_default()
    }

    /// The kind of dish (soup, curry, taco...): title, source labels,
    /// instructions, then ingredients; the first text with a match decides
    fn dish_kind(input: &TagInput) -> Option<&'static str> {
        let texts = [
            input.title.to_string(),
            input.source_labels(),
            input.instructions.join("\n"),
            input.ingredients.join("\n"),
        ];
        texts.iter().find_map(|text| {
            DISH_TYPE_WORDS
                .first(text)
                .and_then(|term| lookup(DISH_TYPES, &term))
        })
    }

    fn meal_types(input: &TagInput) -> Vec<&'static str> {
        let text = format!("{}\n{}", input.title, input.source_labels());
        let mut tags = tags_for(&MEAL_TYPE_WORDS, MEAL_TYPES, &text);
        match DishType::from_text(&text, false) {
            Some(DishType::Dessert) => tags.push("dessert"),
            Some(DishType::Snack) => tags.push("snack"),
            _ => {}
        }
        tags
    }

    /// Cuisine, main ingredients, cooking methods, timing and size, then
    /// source keywords that name a known tag
    fn keyword_tags(input: &TagInput) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();

        if let Some(cuisine) = &input.metadata.cuisine {
            tags.push(slug_tag(cuisine));
        }

        let ingredients = input.ingredients.join("\n");
        let mut mains = tags_for(&MAIN_INGREDIENT_WORDS, MAIN_INGREDIENTS, &ingredients);
        mains.extend(
            input
                .dietary
                .staples
                .iter()
                .filter_map(|staple| lookup(STAPLE_TAGS, staple)),
        );
        mains.dedup();
        tags.extend(mains.into_iter().take(3).map(String::from));

        let method_text = format!("{}\n{}", input.title, input.instructions.join("\n"));
        tags.extend(
            tags_for(&COOKING_METHOD_WORDS, COOKING_METHODS, &method_text)
                .into_iter()
                .map(String::from),
        );

        let metadata = input.metadata;
        let quick = match (metadata.total_time, metadata.prep_time) {
            (Some(total), _) => total <= 30,
            (None, Some(prep)) => prep <= 15,
            (None, None) => false,
        };
        if quick {
            tags.push("quick".to_string());
        }
        if input.ingredients.len() <= 5 {
            tags.push("5-ingredients".to_string());
        }

        for keyword in input
            .raw_metadata
            .category
            .iter()
            .chain(&input.raw_metadata.keywords)
        {
            let candidate = slug_tag(keyword);
            if KEYWORD_VOCABULARY.contains(&candidate.as_str()) {
                tags.push(candidate);
            } else if let Some(cuisine) = canonical_cuisine(keyword) {
                tags.push(slug_tag(&cuisine));
            }
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dietary::DietaryFlags;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_priority_and_vocabulary() {
        let ingredients = lines(&["1 lb chicken thighs", "2 cups rice", "1 tbsp soy sauce"]);
        let instructions = lines(&["Grill the chicken.", "Serve over rice."]);
        let metadata = Metadata {
            total_time: Some(25),
            cuisine: Some("Japanese".to_string()),
            ..Default::default()
        };
        let raw_metadata = RawMetadata {
            keywords: lines(&["Weeknight", "my favourite thing", "Dinner"]),
            ..Default::default()
        };
        let dietary = DietaryReport {
            flags: DietaryFlags {
                vegetarian: Some(false),
                dairy_free: Some(true),
                ..Default::default()
            },
            staples: vec!["rice".to_string()],
        };
        let input = TagInput {
            source_tag: "Facebook",
            title: "Teriyaki Chicken Bowls",
            ingredients: &ingredients,
            instructions: &instructions,
            metadata: &metadata,
            raw_metadata: &raw_metadata,
            dietary: &dietary,
            complexity: Complexity::Easy,
        };

        let tags = TagGenerator::default().generate(&input);
        let expected: BTreeSet<String> = [
            "facebook",
            "dairy-free",
            "main-dish",
            "bowl",
            "dinner",
            "easy",
            "japanese",
            "chicken",
            "rice",
            "grilled",
            "quick",
            "5-ingredients",
            "weeknight",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn test_cap_keeps_highest_priority() {
        let ingredients = lines(&["2 cups flour", "1 cup sugar", "2 eggs"]);
        let instructions = lines(&["Bake for 30 minutes."]);
        let metadata = Metadata::default();
        let raw_metadata = RawMetadata::default();
        let dietary = DietaryReport {
            flags: DietaryFlags {
                vegetarian: Some(true),
                ..Default::default()
            },
            staples: Vec::new(),
        };
        let input = TagInput {
            source_tag: "pinchofyum",
            title: "Brown Butter Cookies",
            ingredients: &ingredients,
            instructions: &instructions,
            metadata: &metadata,
            raw_metadata: &raw_metadata,
            dietary: &dietary,
            complexity: Complexity::Easy,
        };

        let tags = TagGenerator::new(3).generate(&input);
        let expected: BTreeSet<String> = ["pinchofyum", "vegetarian", "dessert"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tags, expected);

        let tags = TagGenerator::new(0).generate(&input);
        assert!(tags.contains("pinchofyum"));
    }

    #[test]
    fn test_dessert_from_ingredients() {
        let ingredients = lines(&["1 box cake mix", "3 eggs"]);
        let instructions = lines(&["Mix and bake."]);
        let metadata = Metadata::default();
        let raw_metadata = RawMetadata::default();
        let dietary = DietaryReport::default();
        let input = TagInput {
            source_tag: "facebook",
            title: "Grandma's Favorite",
            ingredients: &ingredients,
            instructions: &instructions,
            metadata: &metadata,
            raw_metadata: &raw_metadata,
            dietary: &dietary,
            complexity: Complexity::Easy,
        };
        let tags = TagGenerator::default().generate(&input);
        assert!(tags.contains("dessert"));
        assert!(tags.contains("baked"));
        assert!(!tags.contains("main-dish"));
        assert!(tags.contains("cake"));
    }

    #[test]
    fn test_dish_kind_from_title_before_body() {
        let ingredients = lines(&["2 cups cooked rice", "1 can crushed tomatoes", "1 cup cream"]);
        let instructions = lines(&["Simmer the tomatoes.", "Stir in the cream."]);
        let metadata = Metadata::default();
        let raw_metadata = RawMetadata::default();
        let dietary = DietaryReport::default();
        let tags_for_title = |title: &str| {
            TagGenerator::default().generate(&TagInput {
                source_tag: "facebook",
                title,
                ingredients: &ingredients,
                instructions: &instructions,
                metadata: &metadata,
                raw_metadata: &raw_metadata,
                dietary: &dietary,
                complexity: Complexity::Easy,
            })
        };

        let soup = tags_for_title("Creamy Tomato Soup");
        assert!(soup.contains("soup"));
        assert!(soup.contains("main-dish"));
        assert!(!soup.contains("rice"));

        assert!(tags_for_title("Beef Stew").contains("stew"));
        assert!(tags_for_title("Chicken Casserole").contains("casserole"));
        assert!(tags_for_title("Red Lentil Curry").contains("curry"));

        // nothing in the title, so the ingredients decide
        assert!(tags_for_title("Grandma's Favorite").contains("rice"));
    }
}
