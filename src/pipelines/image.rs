use super::prompt::{image_analysis_prompt, VERIFY_IMAGE_PROMPT};
use super::PipelineSettings;
use crate::extract::extract_json;
use crate::images::{self, EncodedImage, ImageSource};
use crate::model::{AnalysisKind, NutritionResult, VerificationResult};
use crate::providers::{GenerateRequest, GenerativeModel, Part};
use crate::AnalysisError;
use log::{debug, info, warn};

/// Stages of a single image analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStage {
    Idle,
    Encoding,
    Verifying,
    /// The model said the image is not food; terminal
    Rejected,
    Analyzing,
    Succeeded,
    Failed,
}

/// Analyse a food image: encode, verify it shows food, then request nutrition
/// data in `language`.
///
/// No retries: the first failure at any stage aborts the pipeline.
pub async fn process(
    model: &dyn GenerativeModel,
    settings: &PipelineSettings,
    image: &ImageSource,
    language: &str,
) -> Result<NutritionResult, AnalysisError> {
    process_with_progress(model, settings, image, language, |_| {}).await
}

/// Same as [`process`], reporting every stage transition to `on_stage`
pub async fn process_with_progress<F>(
    model: &dyn GenerativeModel,
    settings: &PipelineSettings,
    image: &ImageSource,
    language: &str,
    on_stage: F,
) -> Result<NutritionResult, AnalysisError>
where
    F: FnMut(ImageStage) + Send,
{
    let mut tracker = StageTracker::new(on_stage);

    let result = run(model, settings, image, language, &mut tracker).await;
    match &result {
        Ok(_) => tracker.enter(ImageStage::Succeeded),
        Err(AnalysisError::NotFood { .. }) => tracker.enter(ImageStage::Rejected),
        Err(e) => {
            warn!("Image analysis failed: {}", e);
            tracker.enter(ImageStage::Failed)
        }
    }
    result
}

async fn run<F>(
    model: &dyn GenerativeModel,
    settings: &PipelineSettings,
    image: &ImageSource,
    language: &str,
    tracker: &mut StageTracker<F>,
) -> Result<NutritionResult, AnalysisError>
where
    F: FnMut(ImageStage) + Send,
{
    tracker.enter(ImageStage::Encoding);
    let encoded = images::encode(image).await?;

    tracker.enter(ImageStage::Verifying);
    let verification = verify(model, settings, &encoded).await?;
    if !verification.is_food {
        let description = if verification.description.trim().is_empty() {
            "an unclear or non-food image".to_string()
        } else {
            verification.description
        };
        info!("Image rejected as non-food: {}", description);
        return Err(AnalysisError::NotFood { description });
    }

    tracker.enter(ImageStage::Analyzing);
    let text = model
        .generate(&GenerateRequest {
            model: settings.image_model.clone(),
            parts: vec![
                Part::text(image_analysis_prompt(language)),
                Part::inline_data(&encoded.mime_type, &encoded.data),
            ],
            generation_config: settings.analysis.clone(),
        })
        .await?;

    let raw = extract_json(&text)?;
    NutritionResult::from_model_output(&raw, AnalysisKind::Image)
}

async fn verify(
    model: &dyn GenerativeModel,
    settings: &PipelineSettings,
    encoded: &EncodedImage,
) -> Result<VerificationResult, AnalysisError> {
    let text = model
        .generate(&GenerateRequest {
            model: settings.image_model.clone(),
            parts: vec![
                Part::text(VERIFY_IMAGE_PROMPT.trim_end()),
                Part::inline_data(&encoded.mime_type, &encoded.data),
            ],
            generation_config: settings.verification.clone(),
        })
        .await?;

    let raw = extract_json(&text)?;
    Ok(VerificationResult::from_model_output(&raw))
}

struct StageTracker<F> {
    current: ImageStage,
    on_stage: F,
}

impl<F: FnMut(ImageStage)> StageTracker<F> {
    fn new(on_stage: F) -> Self {
        StageTracker {
            current: ImageStage::Idle,
            on_stage,
        }
    }

    fn enter(&mut self, stage: ImageStage) {
        debug!("Image pipeline: {:?} -> {:?}", self.current, stage);
        self.current = stage;
        (self.on_stage)(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::testing::ScriptedModel;

    fn jpeg() -> ImageSource {
        ImageSource::Bytes {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        }
    }

    async fn run_recording(
        model: &ScriptedModel,
        image: &ImageSource,
    ) -> (Result<NutritionResult, AnalysisError>, Vec<ImageStage>) {
        let mut stages = Vec::new();
        let result = process_with_progress(
            model,
            &PipelineSettings::default(),
            image,
            "English",
            |s| stages.push(s),
        )
        .await;
        (result, stages)
    }

    #[tokio::test]
    async fn test_successful_two_stage_analysis() {
        let model = ScriptedModel::new(vec![
            Ok(r#"{"isFood": true, "description": "a bowl of noodle soup"}"#.to_string()),
            Ok(r#"Here you go: {"name": "Pho", "calories": "450", "ingredients": ["rice noodles", "beef"], "nutrition": {"protein": "25g", "carbs": "60g", "fat": "10g"}, "category": "main course", "cuisine": "Vietnamese"}"#.to_string()),
        ]);

        let (result, stages) = run_recording(&model, &jpeg()).await;
        let result = result.unwrap();

        assert_eq!(result.food_name, "Pho");
        assert_eq!(result.cuisine, "Vietnamese");
        assert!(result.nutrition.fiber.is_none());
        assert_eq!(
            stages,
            vec![
                ImageStage::Encoding,
                ImageStage::Verifying,
                ImageStage::Analyzing,
                ImageStage::Succeeded
            ]
        );

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].generation_config.max_output_tokens, 1024);
        assert_eq!(requests[1].generation_config.max_output_tokens, 2048);
        assert_eq!(requests[1].parts[1], Part::inline_data("image/jpeg", "/9j/"));
        match &requests[1].parts[0] {
            Part::Text { text } => assert!(text.contains("in English")),
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_food_skips_analysis() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"isFood": false, "description": "a cat"}"#.to_string()
        )]);

        let (result, stages) = run_recording(&model, &jpeg()).await;

        match result {
            Err(err @ AnalysisError::NotFood { .. }) => assert!(err.to_string().contains("a cat")),
            other => panic!("expected NotFood, got {other:?}"),
        }
        assert_eq!(model.request_count(), 1);
        assert_eq!(stages.last(), Some(&ImageStage::Rejected));
        assert!(!stages.contains(&ImageStage::Analyzing));
    }

    #[tokio::test]
    async fn test_not_food_without_description() {
        let model = ScriptedModel::new(vec![Ok(r#"{"isFood": false}"#.to_string())]);
        let (result, _) = run_recording(&model, &jpeg()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("an unclear or non-food image"));
    }

    #[tokio::test]
    async fn test_null_description_on_food_still_analyses() {
        let model = ScriptedModel::new(vec![
            Ok(r#"{"isFood": true, "description": null}"#.to_string()),
            Ok(r#"{"name": "Bagel", "calories": "250"}"#.to_string()),
        ]);
        let (result, stages) = run_recording(&model, &jpeg()).await;
        assert_eq!(result.unwrap().food_name, "Bagel");
        assert_eq!(stages.last(), Some(&ImageStage::Succeeded));
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_null_is_food_is_rejected() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"isFood": null, "description": null}"#.to_string()
        )]);
        let (result, stages) = run_recording(&model, &jpeg()).await;
        match result {
            Err(err @ AnalysisError::NotFood { .. }) => {
                assert!(err.to_string().contains("an unclear or non-food image"))
            }
            other => panic!("expected NotFood, got {other:?}"),
        }
        assert_eq!(stages.last(), Some(&ImageStage::Rejected));
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_verification() {
        let model = ScriptedModel::new(vec![Ok("I think so!".to_string())]);
        let (result, stages) = run_recording(&model, &jpeg()).await;
        assert!(matches!(result, Err(AnalysisError::MalformedResponse(_))));
        assert_eq!(stages.last(), Some(&ImageStage::Failed));
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unidentifiable_food() {
        let model = ScriptedModel::new(vec![
            Ok(r#"{"isFood": true, "description": "food"}"#.to_string()),
            Ok(r#"{"ingredients": ["something"]}"#.to_string()),
        ]);
        let (result, _) = run_recording(&model, &jpeg()).await;
        assert!(matches!(result, Err(AnalysisError::UnidentifiableFood)));
    }

    #[tokio::test]
    async fn test_upstream_error_in_analysis_aborts() {
        let model = ScriptedModel::new(vec![
            Ok(r#"{"isFood": true, "description": "food"}"#.to_string()),
            Err(AnalysisError::Upstream {
                status: Some(500),
                message: "Internal error".to_string(),
            }),
        ]);
        let (result, stages) = run_recording(&model, &jpeg()).await;
        assert!(matches!(
            result,
            Err(AnalysisError::Upstream {
                status: Some(500),
                ..
            })
        ));
        assert_eq!(stages.last(), Some(&ImageStage::Failed));
    }

    #[tokio::test]
    async fn test_encoding_failure_makes_no_calls() {
        let model = ScriptedModel::new(vec![]);
        let (result, stages) =
            run_recording(&model, &ImageSource::DataUri("garbage".to_string())).await;
        assert!(matches!(result, Err(AnalysisError::Encoding(_))));
        assert_eq!(model.request_count(), 0);
        assert_eq!(stages, vec![ImageStage::Encoding, ImageStage::Failed]);
    }
}
