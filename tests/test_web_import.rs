use mockito::{Matcher, Server};
use std::time::Duration;

use recipe_scraper::model::{Complexity, Macro};
use recipe_scraper::sites::SiteSelectors;
use recipe_scraper::{EdamamClient, ImportError, RecipeImporter, RecipeStore, ScraperConfig};

const PINCH_OF_YUM: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta property="og:url" content="https://pinchofyum.com/spicy-peanut-soba-noodles">
    <script type="application/ld+json">
    {
        "@context": "https://schema.org",
        "@graph": [
            {"@type": "WebPage", "name": "Spicy Peanut Soba Noodles - Pinch of Yum"},
            {
                "@type": "Recipe",
                "name": "Spicy Peanut Soba Noodles",
                "image": ["https://pinchofyum.com/wp-content/uploads/soba.jpg"],
                "prepTime": "PT15M",
                "cookTime": "PT10M",
                "totalTime": "PT25M",
                "recipeYield": ["4", "4 servings"],
                "recipeCuisine": "Asian",
                "recipeCategory": "Dinner",
                "keywords": "noodles, peanut sauce, weeknight",
                "recipeIngredient": [
                    "8 ounces soba noodles",
                    "1/4 cup peanut butter",
                    "2 tablespoons soy sauce",
                    "1 tablespoon sriracha",
                    "1 cup shredded carrots"
                ],
                "recipeInstructions": [
                    {"@type": "HowToStep", "text": "Cook the noodles according to package directions."},
                    {"@type": "HowToStep", "text": "Whisk the peanut butter, soy sauce and sriracha."},
                    {"@type": "HowToStep", "text": "Toss the noodles with the sauce and carrots."}
                ],
                "nutrition": {
                    "@type": "NutritionInformation",
                    "calories": "420 calories",
                    "proteinContent": "14 g",
                    "carbohydrateContent": "58 g",
                    "fatContent": "16 g",
                    "sodiumContent": "890 mg"
                }
            }
        ]
    }
    </script>
</head>
<body><h1>Spicy Peanut Soba Noodles</h1></body>
</html>"#;

const KITCHEN_PAGE: &str = r#"<html><body>
    <h1 class="recipe-title">Lemon Chicken</h1>
    <p class="recipe-servings">4 servings</p>
    <p class="recipe-prep">15 mins</p>
    <p class="recipe-cook">30 mins</p>
    <ul class="ingredients">
        <li>1 lb chicken thighs</li>
        <li>2 lemons</li>
        <li>3 cloves garlic</li>
    </ul>
    <ol class="steps">
        <li>Season the chicken.</li>
        <li>Roast with the lemons and garlic for 30 minutes.</li>
    </ol>
</body></html>"#;

fn kitchen_config() -> ScraperConfig {
    ScraperConfig {
        sites: vec![SiteSelectors {
            domain: "127.0.0.1".to_string(),
            name: "Test Kitchen".to_string(),
            tag: "testkitchen".to_string(),
            title: vec![".recipe-title".to_string()],
            ingredients: vec![".ingredients li".to_string()],
            instructions: vec![".steps li".to_string()],
            prep_time: vec![".recipe-prep".to_string()],
            cook_time: vec![".recipe-cook".to_string()],
            servings: vec![".recipe-servings".to_string()],
            ..Default::default()
        }],
        ..Default::default()
    }
}

const NUTRITION_RESPONSE: &str = r#"{
    "uri": "http://www.edamam.com/ontologies/edamam.owl#recipe_1",
    "calories": 1200,
    "totalWeight": 850.5,
    "totalNutrients": {
        "ENERC_KCAL": {"label": "Energy", "quantity": 1200.0, "unit": "kcal"},
        "PROCNT": {"label": "Protein", "quantity": 96.0, "unit": "g"},
        "CHOCDF": {"label": "Carbs", "quantity": 24.0, "unit": "g"},
        "FAT": {"label": "Fat", "quantity": 80.0, "unit": "g"},
        "NA": {"label": "Sodium", "quantity": 1800.0, "unit": "mg"}
    }
}"#;

#[tokio::test]
async fn test_json_ld_page() {
    let importer = RecipeImporter::builder().build().unwrap();
    let outcome = importer
        .import_html("https://pinchofyum.com/spicy-peanut-soba-noodles", PINCH_OF_YUM)
        .await
        .unwrap();
    let record = outcome.recipe.record();

    assert_eq!(record.title, "Spicy Peanut Soba Noodles");
    assert_eq!(record.source, "Pinch of Yum");
    assert_eq!(
        record.source_url.as_deref(),
        Some("https://pinchofyum.com/spicy-peanut-soba-noodles")
    );
    assert_eq!(
        record.image_url.as_deref(),
        Some("https://pinchofyum.com/wp-content/uploads/soba.jpg")
    );
    assert_eq!(record.ingredients.len(), 5);
    assert_eq!(record.instructions.len(), 3);
    assert_eq!(record.metadata.total_time, Some(25));
    assert_eq!(record.metadata.servings, Some(4));
    assert_eq!(record.complexity, Complexity::Easy);

    // schema.org figures are per serving
    let nutrition = &record.nutrition;
    assert_eq!(nutrition.per_serving.get(Macro::Calories), Some(420.0));
    assert_eq!(nutrition.raw.get(Macro::Calories), Some(1680.0));
    assert_eq!(nutrition.per_serving.get(Macro::Sodium), Some(890.0));
    assert_eq!(nutrition.raw.get(Macro::Fiber), None);

    let tags = outcome.recipe.tags();
    assert!(tags.contains("pinchofyum"));
    assert!(tags.contains("vegetarian"));
    assert!(tags.contains("dinner"));
    assert!(tags.contains("quick"));
    assert!(tags.contains("weeknight"));
    assert!(!tags.contains("gluten-free"));

    assert_eq!(
        outcome.recipe.identity_key(),
        "spicy-peanut-soba-noodles::pinch-of-yum"
    );
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_fetch_with_site_selectors_and_nutrition_service() {
    let mut pages = Server::new_async().await;
    let page = pages
        .mock("GET", "/lemon-chicken")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(KITCHEN_PAGE)
        .create_async()
        .await;

    let mut api = Server::new_async().await;
    let lookup = api
        .mock("GET", "/api/nutrition-data")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("app_id".into(), "test-id".into()),
            Matcher::UrlEncoded("app_key".into(), "test-key".into()),
            Matcher::UrlEncoded(
                "ingr".into(),
                "1 lb chicken thighs\n2 lemons\n3 cloves garlic".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(NUTRITION_RESPONSE)
        .create_async()
        .await;

    let client =
        EdamamClient::with_base_url("test-id", "test-key", api.url(), Duration::from_secs(5))
            .unwrap();
    let importer = RecipeImporter::builder()
        .config(kitchen_config())
        .nutrition_lookup(client)
        .build()
        .unwrap();

    let url = format!("{}/lemon-chicken", pages.url());
    let outcome = importer.import_url(&url).await.unwrap();
    let record = outcome.recipe.record();

    page.assert_async().await;
    lookup.assert_async().await;

    assert_eq!(record.title, "Lemon Chicken");
    assert_eq!(record.source, "Test Kitchen");
    assert_eq!(record.source_url.as_deref(), Some(url.as_str()));
    assert_eq!(record.metadata.total_time, Some(45));
    assert_eq!(record.metadata.servings, Some(4));

    // service totals split over four servings
    let nutrition = &record.nutrition;
    assert_eq!(nutrition.raw.get(Macro::Calories), Some(1200.0));
    assert_eq!(nutrition.per_serving.get(Macro::Calories), Some(300.0));
    assert_eq!(nutrition.per_meal.get(Macro::Calories), Some(300.0));
    assert_eq!(nutrition.per_serving.get(Macro::Sodium), Some(450.0));
    assert_eq!(nutrition.per_serving.get(Macro::Carbs), Some(6.0));

    let tags = outcome.recipe.tags();
    assert!(tags.contains("testkitchen"));
    assert!(tags.contains("chicken"));
    assert!(tags.contains("roasted"));
    assert!(tags.contains("keto"));
    assert!(tags.contains("low-carb"));
    assert!(!tags.contains("vegetarian"));

    assert_eq!(outcome.recipe.identity_key(), "lemon-chicken::test-kitchen");
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_rate_limited_nutrition_is_a_warning() {
    let mut pages = Server::new_async().await;
    pages
        .mock("GET", "/lemon-chicken")
        .with_status(200)
        .with_body(KITCHEN_PAGE)
        .create_async()
        .await;

    let mut api = Server::new_async().await;
    api.mock("GET", "/api/nutrition-data")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let client = EdamamClient::with_base_url("id", "key", api.url(), Duration::from_secs(5))
        .unwrap();
    let importer = RecipeImporter::builder()
        .config(kitchen_config())
        .nutrition_lookup(client)
        .build()
        .unwrap();

    let outcome = importer
        .import_url(&format!("{}/lemon-chicken", pages.url()))
        .await
        .unwrap();

    assert!(outcome.recipe.record().nutrition.is_empty());
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, ImportError::ExternalUnavailable(_))));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, ImportError::PartialData(_))));
}

#[tokio::test]
async fn test_missing_page_is_an_error() {
    let mut pages = Server::new_async().await;
    pages
        .mock("GET", "/gone")
        .with_status(404)
        .create_async()
        .await;

    let importer = RecipeImporter::builder().build().unwrap();
    let result = importer.import_url(&format!("{}/gone", pages.url())).await;

    assert!(matches!(
        result,
        Err(ImportError::HttpStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_page_without_recipe_is_malformed() {
    let html = "<html><head><title>About us</title></head><body><p>We love food.</p></body></html>";
    let importer = RecipeImporter::builder().build().unwrap();
    let result = importer.import_html("https://example.com/about", html).await;

    assert!(matches!(result, Err(ImportError::MalformedInput(_))));
    assert!(importer.store().all().await.unwrap().is_empty());
}
