use log::{error, info};
use std::env;
use std::sync::Arc;

use recipe_scraper::{
    ImportError, InputSource, JsonFileStore, RecipeImporter, RecipeStore, ScraperConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // recipe-scraper <file-or-url> [store.json]
    let args: Vec<String> = env::args().collect();
    let input = args
        .get(1)
        .ok_or("Please provide a text file or a URL as an argument")?;

    let config = ScraperConfig::load().map_err(ImportError::from)?;
    let mut builder = RecipeImporter::builder().config(config);
    if let Some(path) = args.get(2) {
        builder = builder.store(Arc::new(JsonFileStore::new(path)) as Arc<dyn RecipeStore>);
    }
    let importer = builder.build()?;

    let source = match InputSource::detect(input.as_str()) {
        InputSource::Url(url) => InputSource::Url(url),
        InputSource::Text(path) => InputSource::Text(tokio::fs::read_to_string(path).await?),
    };

    let report = importer.import(source).await?;
    for failure in &report.failures {
        error!("Block {} skipped: {}", failure.index, failure.error);
    }
    info!(
        "{} recipes, {} warnings",
        report.outcomes.len(),
        report.warning_count()
    );

    let records: Vec<_> = report.recipes().map(|r| r.record()).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
