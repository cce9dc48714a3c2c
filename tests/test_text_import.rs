use recipe_scraper::model::{Complexity, Macro};
use recipe_scraper::{parse_text, Segmenter};

const FRITTATA: &str = "Spinach Frittata 🍳
Ingredients:
6 eggs
2 cups spinach
1/2 onion, diced
1 tbsp olive oil
Instructions:
1. Whisk the eggs.
2. Saute the onion and spinach.
3. Pour in the eggs and bake until set.";

const BURRITO_BOWLS: &str = "Chicken Burrito Bowls
Prep Time: 15 mins | Cook Time: 20 mins
Servings: 4
Ingredients:
• 1 lb chicken breast
• 2 cups cooked rice
• 1 can black beans
• 1 cup salsa
Directions:
1) Season and grill the chicken.
2) Slice and serve over rice with beans and salsa.
Nutrition (per serving): Calories: 350 | Protein: 20g";

fn big_recipe() -> String {
    let ingredients: Vec<String> = (1..=16).map(|i| format!("- {i} cup spice number {i}")).collect();
    let steps: Vec<String> = (1..=13).map(|i| format!("{i}. Stir the pot again {i}")).collect();
    format!(
        "Everything Stew\nIngredients:\n{}\nInstructions:\n{}",
        ingredients.join("\n"),
        steps.join("\n")
    )
}

#[test]
fn test_blob_with_separators() {
    let blob = format!(
        "{FRITTATA}\n\n------------------------------\n\n{BURRITO_BOWLS}\n\n------------------------------\n\n{}",
        big_recipe()
    );
    let report = parse_text(&blob).unwrap();

    assert!(report.failures.is_empty());
    let titles: Vec<&str> = report.recipes().map(|r| r.title()).collect();
    assert_eq!(
        titles,
        vec!["Spinach Frittata", "Chicken Burrito Bowls", "Everything Stew"]
    );
}

#[test]
fn test_segment_count_matches_sections() {
    let blob = format!(
        "{FRITTATA}\n__________\nonly one line here\n__________\n{BURRITO_BOWLS}\n__________\n{FRITTATA}"
    );
    let segmenter = Segmenter::new(&blob);
    assert_eq!(segmenter.blocks().count(), 3);
    // the iterator restarts from the beginning every time
    assert_eq!(
        segmenter.blocks().collect::<Vec<_>>(),
        segmenter.blocks().collect::<Vec<_>>()
    );
}

#[test]
fn test_numbered_recipes() {
    let blob = "1. Lemon Water
Ingredients:
1 lemon
2 cups water
Directions:
1. Squeeze the lemon.
2. Stir into the water.

2. Mint Tea
Ingredients:
1 handful mint
2 cups boiling water
Directions:
1. Steep the mint for five minutes.";

    let report = parse_text(blob).unwrap();
    let titles: Vec<&str> = report.recipes().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Lemon Water", "Mint Tea"]);
    assert_eq!(report.outcomes[0].recipe.record().instructions.len(), 2);
}

#[test]
fn test_egg_dish_is_vegetarian_not_vegan() {
    let report = parse_text(FRITTATA).unwrap();
    let recipe = &report.outcomes[0].recipe;

    assert_eq!(recipe.title(), "Spinach Frittata");
    assert!(recipe.tags().contains("facebook"));
    assert!(recipe.tags().contains("vegetarian"));
    assert!(!recipe.tags().contains("vegan"));
    assert!(!recipe.tags().contains("keto"));
    assert!(recipe.tags().contains("breakfast"));
    assert!(recipe.record().nutrition.is_empty());
}

#[test]
fn test_metadata_and_explicit_nutrition() {
    let report = parse_text(BURRITO_BOWLS).unwrap();
    let record = report.outcomes[0].recipe.record();

    assert_eq!(record.metadata.prep_time, Some(15));
    assert_eq!(record.metadata.cook_time, Some(20));
    assert_eq!(record.metadata.total_time, Some(35));
    assert_eq!(record.metadata.servings, Some(4));
    assert_eq!(record.ingredients[0], "1 lb chicken breast");
    assert_eq!(record.instructions[0], "Season and grill the chicken.");

    let nutrition = &record.nutrition;
    assert_eq!(nutrition.raw.get(Macro::Calories), Some(1400.0));
    assert_eq!(nutrition.per_serving.get(Macro::Calories), Some(350.0));
    assert_eq!(nutrition.per_meal.get(Macro::Calories), Some(350.0));
    assert_eq!(nutrition.per_serving.get(Macro::Protein), Some(20.0));
    assert_eq!(nutrition.raw.get(Macro::Sodium), None);

    assert!(record.tags.contains("chicken"));
    assert!(record.tags.contains("grilled"));
    assert!(!record.tags.contains("vegetarian"));
}

#[test]
fn test_large_recipe_is_complex() {
    let report = parse_text(&big_recipe()).unwrap();
    let record = report.outcomes[0].recipe.record();

    assert_eq!(record.ingredients.len(), 16);
    assert_eq!(record.instructions.len(), 13);
    assert_eq!(record.complexity, Complexity::Complex);
    assert!(record.tags.contains("complex"));
}

#[test]
fn test_json_round_trip_keeps_identity() {
    let report = parse_text(BURRITO_BOWLS).unwrap();
    let recipe = &report.outcomes[0].recipe;

    let json = recipe.to_json().unwrap();
    let reparsed = recipe_scraper::CanonicalRecipe::from_json(&json).unwrap();
    assert_eq!(reparsed.identity_key(), recipe.identity_key());
    assert_eq!(reparsed.record(), recipe.record());
}
