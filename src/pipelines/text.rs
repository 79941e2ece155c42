use super::prompt::text_analysis_prompt;
use super::PipelineSettings;
use crate::extract::extract_json;
use crate::model::{AnalysisKind, NutritionResult};
use crate::providers::{GenerateRequest, GenerativeModel, Part};
use crate::AnalysisError;
use log::debug;

/// Analyse a free-text food description, answering in `language`.
///
/// Blank descriptions are rejected before any network call.
pub async fn process(
    model: &dyn GenerativeModel,
    settings: &PipelineSettings,
    description: &str,
    language: &str,
) -> Result<NutritionResult, AnalysisError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AnalysisError::Validation(
            "Please enter a food name".to_string(),
        ));
    }

    debug!("Analysing food description: {}", description);
    let text = model
        .generate(&GenerateRequest {
            model: settings.text_model.clone(),
            parts: vec![Part::text(text_analysis_prompt(description, language))],
            generation_config: settings.analysis.clone(),
        })
        .await?;

    let raw = extract_json(&text)?;
    NutritionResult::from_model_output(&raw, AnalysisKind::Text)
}
