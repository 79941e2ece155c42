use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::config::AppConfig;
use crate::images::ImageSource;
use crate::language::language_name;
use crate::model::NutritionResult;
use crate::pipelines::image::ImageStage;
use crate::pipelines::{self, PipelineSettings};
use crate::providers::{GenerativeModel, GoogleProvider};
use crate::AnalysisError;

/// What to analyse
#[derive(Debug, Clone)]
pub enum InputSource {
    /// A food photo
    Image(ImageSource),
    /// A free-text food description
    Text(String),
}

/// A configured generative model plus the pipeline settings to drive it.
///
/// Cheap to clone; clones share the underlying HTTP client.
#[derive(Clone)]
pub struct Analyzer {
    model: Arc<dyn GenerativeModel>,
    settings: PipelineSettings,
}

impl Analyzer {
    pub fn new(model: Arc<dyn GenerativeModel>, settings: PipelineSettings) -> Self {
        Analyzer { model, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Analyse a food image, answering in the language with code `language`
    pub async fn analyze_image(
        &self,
        image: &ImageSource,
        language: &str,
    ) -> Result<NutritionResult, AnalysisError> {
        self.analyze_image_with_progress(image, language, |_| {})
            .await
    }

    /// Same as [`Analyzer::analyze_image`], reporting each pipeline stage
    pub async fn analyze_image_with_progress<F>(
        &self,
        image: &ImageSource,
        language: &str,
        on_stage: F,
    ) -> Result<NutritionResult, AnalysisError>
    where
        F: FnMut(ImageStage) + Send,
    {
        pipelines::image::process_with_progress(
            self.model.as_ref(),
            &self.settings,
            image,
            language_name(language),
            on_stage,
        )
        .await
    }

    /// Analyse a food description, answering in the language with code `language`
    pub async fn analyze_text(
        &self,
        description: &str,
        language: &str,
    ) -> Result<NutritionResult, AnalysisError> {
        pipelines::text::process(
            self.model.as_ref(),
            &self.settings,
            description,
            language_name(language),
        )
        .await
    }
}

/// Builder for configuring and running a food analysis
#[derive(Default)]
pub struct FoodAnalyzerBuilder {
    source: Option<InputSource>,
    language: Option<String>,
    config: Option<AppConfig>,
    model: Option<Arc<dyn GenerativeModel>>,
    api_key: Option<String>,
    base_url: Option<String>,
    image_model: Option<String>,
    text_model: Option<String>,
    timeout: Option<Duration>,
}

impl FoodAnalyzerBuilder {
    /// Analyse the image file at `path`
    ///
    /// # Example
    /// ```
    /// use nutriscan::FoodAnalyzer;
    ///
    /// let builder = FoodAnalyzer::builder()
    ///     .image("/path/to/lunch.jpg");
    /// ```
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(InputSource::Image(ImageSource::Path(path.into())));
        self
    }

    /// Analyse raw image bytes, e.g. a camera frame
    pub fn image_bytes(mut self, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.source = Some(InputSource::Image(ImageSource::Bytes {
            data,
            mime_type: mime_type.into(),
        }));
        self
    }

    /// Analyse an image given as a base64 `data:` URI
    pub fn image_data_uri(mut self, uri: impl Into<String>) -> Self {
        self.source = Some(InputSource::Image(ImageSource::DataUri(uri.into())));
        self
    }

    /// Analyse a free-text description
    ///
    /// # Example
    /// ```
    /// use nutriscan::FoodAnalyzer;
    ///
    /// let builder = FoodAnalyzer::builder()
    ///     .text("grilled chicken breast")
    ///     .language("es");
    /// ```
    pub fn text(mut self, description: impl Into<String>) -> Self {
        self.source = Some(InputSource::Text(description.into()));
        self
    }

    /// Answer language code. Unknown codes fall back to English.
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    /// Use `config` instead of loading `nutriscan.toml` and the environment
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a preconfigured model instead of the Gemini client
    pub fn model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the Gemini API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the Gemini API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Model used for both image stages
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Model used for text analysis
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Set a timeout for HTTP requests
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Build a reusable [`Analyzer`] from the configured options.
    ///
    /// Explicit builder options take precedence over the loaded configuration.
    pub fn analyzer(self) -> Result<Analyzer, AnalysisError> {
        self.into_parts().map(|(analyzer, _, _)| analyzer)
    }

    /// Run the analysis
    ///
    /// # Errors
    /// Returns `AnalysisError` if:
    /// - No input was specified
    /// - The Gemini API key is missing
    /// - Any pipeline stage fails
    ///
    /// # Example
    /// ```no_run
    /// # use nutriscan::FoodAnalyzer;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let result = FoodAnalyzer::builder()
    ///     .text("margherita pizza")
    ///     .build()
    ///     .await?;
    /// println!("{}: {} kcal", result.food_name, result.calories);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(self) -> Result<NutritionResult, AnalysisError> {
        let (analyzer, source, language) = self.into_parts()?;
        let source = source.ok_or_else(|| {
            AnalysisError::Validation(
                "No input specified. Use .image() or .text()".to_string(),
            )
        })?;

        match source {
            InputSource::Image(image) => analyzer.analyze_image(&image, &language).await,
            InputSource::Text(description) => analyzer.analyze_text(&description, &language).await,
        }
    }

    fn into_parts(self) -> Result<(Analyzer, Option<InputSource>, String), AnalysisError> {
        let mut config = match self.config {
            Some(config) => config,
            None => AppConfig::load()?,
        };

        let gemini = &mut config.gemini;
        if let Some(key) = self.api_key {
            gemini.api_key = Some(key);
        }
        if let Some(url) = self.base_url {
            gemini.base_url = url;
        }
        if let Some(model) = self.image_model {
            gemini.image_model = model;
        }
        if let Some(model) = self.text_model {
            gemini.text_model = model;
        }

        let settings = PipelineSettings::from(&config.gemini);
        let model: Arc<dyn GenerativeModel> = match self.model {
            Some(model) => model,
            None => {
                let timeout = self.timeout.or_else(|| config.request_timeout());
                Arc::new(GoogleProvider::new(&config.gemini, timeout)?)
            }
        };
        debug!("Using {} provider", model.provider_name());

        let language = self
            .language
            .unwrap_or_else(|| crate::language::DEFAULT_LANGUAGE_CODE.to_string());

        Ok((Analyzer::new(model, settings), self.source, language))
    }
}

/// Main entry point for the builder API
pub struct FoodAnalyzer;

impl FoodAnalyzer {
    /// Creates a new builder
    ///
    /// # Example
    /// ```
    /// use nutriscan::FoodAnalyzer;
    ///
    /// let builder = FoodAnalyzer::builder();
    /// ```
    pub fn builder() -> FoodAnalyzerBuilder {
        FoodAnalyzerBuilder::default()
    }
}
