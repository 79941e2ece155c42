pub mod image;
pub mod prompt;
pub mod text;

use crate::config::GeminiConfig;
use crate::providers::GenerationConfig;

/// Models and sampling parameters used by the analysis pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Model for both image stages
    pub image_model: String,
    /// Model for free-text analysis
    pub text_model: String,
    /// Sampling for the image verification stage
    pub verification: GenerationConfig,
    /// Sampling for nutrition analysis (image and text)
    pub analysis: GenerationConfig,
}

impl From<&GeminiConfig> for PipelineSettings {
    fn from(config: &GeminiConfig) -> Self {
        let sampling = |max_output_tokens: u32| GenerationConfig {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens,
        };

        PipelineSettings {
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            verification: sampling(config.verification_max_tokens),
            analysis: sampling(config.analysis_max_tokens),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings::from(&GeminiConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::providers::{GenerateRequest, GenerativeModel};
    use crate::AnalysisError;

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, AnalysisError>>>,
        pub requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<String, AnalysisError>>) -> Self {
            ScriptedModel {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, AnalysisError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AnalysisError::MalformedResponse("script exhausted".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.image_model, "gemini-1.5-flash");
        assert_eq!(settings.text_model, "gemini-1.5-pro");
        assert_eq!(settings.verification.max_output_tokens, 1024);
        assert_eq!(settings.analysis.max_output_tokens, 2048);
        assert_eq!(settings.analysis.top_k, 32);
    }
}
