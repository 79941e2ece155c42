use crate::config::GeminiConfig;
use crate::providers::{GenerateRequest, GenerationConfig, GenerativeModel, Part};
use crate::AnalysisError;
use async_trait::async_trait;
use config::ConfigError;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: [Content<'a>; 1],
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: &'a [Part],
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Gemini generate-content client
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: String,
}

impl GoogleProvider {
    /// Create a new Google Gemini provider from configuration
    pub fn new(config: &GeminiConfig, timeout: Option<Duration>) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AnalysisError::Config(ConfigError::NotFound("gemini.api_key".to_string()))
            })?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(GoogleProvider {
            client: builder.build()?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, model
        )
    }
}

#[async_trait]
impl GenerativeModel for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AnalysisError> {
        let body = GenerateContentBody {
            contents: [Content {
                parts: &request.parts,
            }],
            generation_config: &request.generation_config,
        };

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Google Gemini API error ({}): {}", status, error_text);
            return Err(AnalysisError::Upstream {
                status: Some(status.as_u16()),
                message: upstream_message(&error_text)
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        let response_body: GenerateContentResponse = response.json().await?;

        let text = response_body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                AnalysisError::MalformedResponse(
                    "Gemini response has no candidate text".to_string(),
                )
            })?;

        debug!("Gemini returned {} characters", text.len());
        Ok(text)
    }
}

/// Pull `error.message` out of an API error body
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
