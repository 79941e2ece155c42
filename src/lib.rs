pub mod auth;
pub mod autocomplete;
pub mod builder;
pub mod camera;
pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod language;
pub mod model;
pub mod nutritionix;
pub mod pipelines;
pub mod preferences;
pub mod providers;
pub mod render;
pub mod session;

use log::debug;
use std::path::Path;

// Re-export commonly used types
pub use builder::{Analyzer, FoodAnalyzer, FoodAnalyzerBuilder, InputSource};
pub use error::AnalysisError;
pub use images::ImageSource;
pub use model::{Nutrition, NutritionResult};
pub use nutritionix::{FoodSearch, FoodSuggestion, NutritionixClient};
pub use session::{AnalysisSession, ViewState};

/// Analyse a food photo with configuration from `nutriscan.toml` and the environment.
///
/// `language` is a language code such as `"en"` or `"ja"`.
pub async fn analyze_image(path: &Path, language: &str) -> Result<NutritionResult, AnalysisError> {
    debug!("Analysing image {}", path.display());
    FoodAnalyzer::builder()
        .image(path)
        .language(language)
        .build()
        .await
}

/// Analyse a free-text food description with configuration from
/// `nutriscan.toml` and the environment.
pub async fn analyze_text(
    description: &str,
    language: &str,
) -> Result<NutritionResult, AnalysisError> {
    FoodAnalyzer::builder()
        .text(description)
        .language(language)
        .build()
        .await
}

/// Search the nutrition database for foods matching `query`
pub async fn search_foods(query: &str) -> Result<Vec<FoodSuggestion>, AnalysisError> {
    let config = crate::config::load_config()?;
    let client = NutritionixClient::new(&config.nutritionix, config.request_timeout())?;
    client.search(query).await
}
