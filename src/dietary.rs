//! Ingredient- and nutrition-based dietary flags.

use log::debug;
use std::sync::LazyLock;

use crate::lexicon::Lexicon;
use crate::model::MacroValues;

static LOOK_ALIKES: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "almond milk",
        "oat milk",
        "soy milk",
        "rice milk",
        "cashew milk",
        "coconut milk",
        "coconut cream",
        "coconut yogurt",
        "plant-based milk",
        "non-dairy milk",
        "peanut butter",
        "almond butter",
        "cashew butter",
        "nut butter",
        "sunflower seed butter",
        "apple butter",
        "cocoa butter",
        "vegan butter",
        "vegan cheese",
        "vegan mayo",
        "vegan mayonnaise",
        "dairy-free cheese",
        "nutritional yeast",
        "cream of tartar",
        "almond flour",
        "coconut flour",
        "cassava flour",
        "tapioca flour",
        "coconut sugar",
        "gluten-free flour",
        "gluten-free bread",
        "gluten-free pasta",
        "gluten-free oats",
        "tamari",
        "coconut aminos",
        "flax egg",
        "egg replacer",
        "cauliflower rice",
    ])
});

static MEAT: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "meat", "beef", "ground beef", "steak", "veal", "pork", "bacon", "pancetta", "ham",
        "sausage", "chorizo", "pepperoni", "salami", "prosciutto", "lard", "lamb", "mutton",
        "venison", "chicken", "turkey", "duck", "goose", "meatball", "fish", "salmon", "tuna",
        "cod", "tilapia", "halibut", "trout", "sardine", "anchovy", "anchovies", "shrimp",
        "prawn", "crab", "lobster", "scallop", "clam", "mussel", "oyster", "squid", "calamari",
        "octopus", "seafood",
    ])
});

static DAIRY: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "milk", "buttermilk", "butter", "ghee", "cream", "sour cream", "heavy cream",
        "whipping cream", "cream cheese", "half-and-half", "cheese", "parmesan", "mozzarella",
        "cheddar", "ricotta", "feta", "mascarpone", "gruyere", "brie", "yogurt", "yoghurt",
        "whey", "ice cream", "custard",
    ])
});

static ANIMAL_EXTRAS: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&["egg", "egg white", "egg yolk", "honey", "gelatin", "gelatine", "mayonnaise", "mayo"])
});

static GLUTEN: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "wheat", "flour", "all-purpose flour", "bread", "breadcrumb", "bread crumb", "panko",
        "pasta", "spaghetti", "penne", "fettuccine", "linguine", "lasagna", "macaroni", "noodle",
        "couscous", "barley", "rye", "spelt", "semolina", "bulgur", "farro", "seitan",
        "soy sauce", "beer", "malt", "cracker", "pita", "croissant", "bun", "tortilla",
    ])
});

static STAPLES: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "rice", "pasta", "spaghetti", "noodle", "bread", "potato", "sweet potato", "quinoa",
        "oat", "oats", "tortilla", "couscous", "corn", "flour", "sugar",
    ])
});

static PALEO_EXCLUDED: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::new(&[
        "bean", "black bean", "kidney bean", "pinto bean", "chickpea", "garbanzo", "lentil",
        "pea", "peanut", "soy", "tofu", "tempeh", "edamame", "hummus", "rice", "wheat", "flour",
        "bread", "pasta", "noodle", "oat", "oats", "corn", "quinoa", "barley", "rye", "cereal",
        "sugar", "brown sugar", "white sugar", "granulated sugar", "powdered sugar",
        "corn syrup",
    ])
});

/// Each flag is `None` when it could not be evaluated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DietaryFlags {
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub gluten_free: Option<bool>,
    pub dairy_free: Option<bool>,
    pub keto: Option<bool>,
    pub low_carb: Option<bool>,
    pub paleo: Option<bool>,
}

impl DietaryFlags {
    /// Tags for the flags known to hold
    pub fn tags(&self) -> Vec<&'static str> {
        [
            (self.vegetarian, "vegetarian"),
            (self.vegan, "vegan"),
            (self.gluten_free, "gluten-free"),
            (self.dairy_free, "dairy-free"),
            (self.keto, "keto"),
            (self.low_carb, "low-carb"),
            (self.paleo, "paleo"),
        ]
        .into_iter()
        .filter_map(|(flag, tag)| (flag == Some(true)).then_some(tag))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DietaryReport {
    pub flags: DietaryFlags,
    /// High-carbohydrate staples named by the ingredients
    pub staples: Vec<String>,
}

pub struct DietaryClassifier;

impl DietaryClassifier {
    /// `per_serving` must already be normalized to grams per serving
    pub fn classify(ingredients: &[String], per_serving: &MacroValues) -> DietaryReport {
        let (keto, low_carb) = Self::nutrition_flags(per_serving);
        if ingredients.is_empty() {
            return DietaryReport {
                flags: DietaryFlags {
                    keto,
                    low_carb,
                    ..Default::default()
                },
                staples: Vec::new(),
            };
        }

        let text = LOOK_ALIKES.remove(&ingredients.join("\n"));
        let meat = MEAT.is_match(&text);
        let dairy = DAIRY.is_match(&text);
        let animal = dairy || ANIMAL_EXTRAS.is_match(&text);
        let gluten = GLUTEN.is_match(&text);
        let paleo_excluded = dairy || gluten || PALEO_EXCLUDED.is_match(&text);

        let flags = DietaryFlags {
            vegetarian: Some(!meat),
            vegan: Some(!meat && !animal),
            gluten_free: Some(!gluten),
            dairy_free: Some(!dairy),
            keto,
            low_carb,
            paleo: Some(!paleo_excluded),
        };
        debug!("DietaryClassifier: {:?}", flags);

        DietaryReport {
            flags,
            staples: STAPLES.matches(&text),
        }
    }

    fn nutrition_flags(per_serving: &MacroValues) -> (Option<bool>, Option<bool>) {
        let low_carb = per_serving.carbs.map(|carbs| carbs < 30.0);
        let keto = match (per_serving.carbs, per_serving.fat, per_serving.protein) {
            (Some(carbs), Some(fat), Some(protein)) => {
                let net_carbs = carbs - per_serving.fiber.unwrap_or(0.0);
                let fat_calories = fat * 9.0;
                Some(
                    net_carbs <= 10.0
                        && fat_calories > protein * 4.0
                        && fat_calories > carbs * 4.0,
                )
            }
            _ => None,
        };
        (keto, low_carb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_egg_without_nutrition() {
        let ingredients = lines(&["2 eggs", "1 cup spinach", "1 tbsp olive oil"]);
        let report = DietaryClassifier::classify(&ingredients, &MacroValues::default());

        assert_eq!(report.flags.vegetarian, Some(true));
        assert_eq!(report.flags.vegan, Some(false));
        assert_ne!(report.flags.keto, Some(true));
        assert_eq!(report.flags.keto, None);
        assert_eq!(report.flags.low_carb, None);
        assert_eq!(report.flags.dairy_free, Some(true));
    }

    #[test]
    fn test_look_alikes_are_not_animal_products() {
        let ingredients = lines(&[
            "1 cup almond milk",
            "2 tbsp peanut butter",
            "1 cup almond flour",
            "1 tbsp coconut sugar",
        ]);
        let report = DietaryClassifier::classify(&ingredients, &MacroValues::default());

        assert_eq!(report.flags.vegan, Some(true));
        assert_eq!(report.flags.dairy_free, Some(true));
        assert_eq!(report.flags.gluten_free, Some(true));
        assert_eq!(report.flags.paleo, Some(true));
    }

    #[test]
    fn test_meat_words_inside_other_words_do_not_count() {
        let ingredients = lines(&["1 hamburger bun", "1 veggie patty"]);
        let report = DietaryClassifier::classify(&ingredients, &MacroValues::default());
        assert_eq!(report.flags.vegetarian, Some(true));
        assert_eq!(report.flags.gluten_free, Some(false));
    }

    #[test]
    fn test_meat_and_gluten() {
        let ingredients = lines(&["1 lb ground beef", "8 oz spaghetti", "1 jar marinara"]);
        let report = DietaryClassifier::classify(&ingredients, &MacroValues::default());

        assert_eq!(report.flags.vegetarian, Some(false));
        assert_eq!(report.flags.vegan, Some(false));
        assert_eq!(report.flags.gluten_free, Some(false));
        assert_eq!(report.flags.paleo, Some(false));
        assert_eq!(report.staples, vec!["spaghetti"]);
    }

    #[test]
    fn test_keto_needs_fat_dominance() {
        let keto = MacroValues {
            carbs: Some(8.0),
            fiber: Some(3.0),
            fat: Some(30.0),
            protein: Some(20.0),
            ..Default::default()
        };
        let report = DietaryClassifier::classify(&lines(&["2 avocados"]), &keto);
        assert_eq!(report.flags.keto, Some(true));
        assert_eq!(report.flags.low_carb, Some(true));

        let lean = MacroValues {
            carbs: Some(5.0),
            fat: Some(5.0),
            protein: Some(40.0),
            ..Default::default()
        };
        let report = DietaryClassifier::classify(&lines(&["1 chicken breast"]), &lean);
        assert_eq!(report.flags.keto, Some(false));
    }

    #[test]
    fn test_low_carb_needs_carbs_only() {
        let values = MacroValues {
            carbs: Some(45.0),
            ..Default::default()
        };
        let report = DietaryClassifier::classify(&lines(&["2 cups rice"]), &values);
        assert_eq!(report.flags.low_carb, Some(false));
        assert_eq!(report.flags.keto, None);
    }

    #[test]
    fn test_tags_only_for_true_flags() {
        let flags = DietaryFlags {
            vegetarian: Some(true),
            vegan: Some(false),
            gluten_free: None,
            ..Default::default()
        };
        assert_eq!(flags.tags(), vec!["vegetarian"]);
    }
}
