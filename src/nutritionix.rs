use async_trait::async_trait;
use config::ConfigError;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::NutritionixConfig;
use crate::AnalysisError;

/// One entry from the instant-search response (common or branded item)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodSuggestion {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub brand_name_item_name: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub serving_qty: Option<f64>,
    #[serde(default)]
    pub serving_unit: Option<String>,
}

impl FoodSuggestion {
    /// Name shown to the user: the first non-empty of `food_name`,
    /// `brand_name_item_name` and `brand_name`
    pub fn display_name(&self) -> &str {
        [&self.food_name, &self.brand_name_item_name, &self.brand_name]
            .into_iter()
            .filter_map(|name| name.as_deref())
            .find(|name| !name.is_empty())
            .unwrap_or_default()
    }

    /// Serving line, e.g. "1 cup", when a unit is known
    pub fn serving_details(&self) -> Option<String> {
        let unit = self.serving_unit.as_deref().filter(|u| !u.is_empty())?;
        match self.serving_qty {
            Some(qty) if qty.fract() == 0.0 => Some(format!("{} {}", qty as i64, unit)),
            Some(qty) => Some(format!("{} {}", qty, unit)),
            None => Some(unit.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct InstantSearchResponse {
    common: Option<Vec<FoodSuggestion>>,
    branded: Option<Vec<FoodSuggestion>>,
}

/// Source of autocomplete candidates
#[async_trait]
pub trait FoodSearch: Send + Sync {
    /// Ranked candidates for `query`, common items first
    async fn search(&self, query: &str) -> Result<Vec<FoodSuggestion>, AnalysisError>;
}

/// Nutritionix instant-search client
pub struct NutritionixClient {
    client: Client,
    app_id: String,
    app_key: String,
    base_url: String,
    remote_user_id: String,
    max_suggestions: usize,
}

impl NutritionixClient {
    /// Create a client from configuration. Both credentials are required.
    pub fn new(config: &NutritionixConfig, timeout: Option<Duration>) -> Result<Self, AnalysisError> {
        let credential = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AnalysisError::Config(ConfigError::NotFound(key.to_string())))
        };

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(NutritionixClient {
            client: builder.build()?,
            app_id: credential(&config.app_id, "nutritionix.app_id")?,
            app_key: credential(&config.app_key, "nutritionix.app_key")?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            remote_user_id: config.remote_user_id.clone(),
            max_suggestions: config.max_suggestions,
        })
    }
}

#[async_trait]
impl FoodSearch for NutritionixClient {
    async fn search(&self, query: &str) -> Result<Vec<FoodSuggestion>, AnalysisError> {
        let url = format!("{}/v2/search/instant", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("detailed", "true")])
            .header("x-app-id", &self.app_id)
            .header("x-app-key", &self.app_key)
            .header("x-remote-user-id", &self.remote_user_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Nutritionix API error ({}): {}", status, error_text);
            return Err(AnalysisError::Upstream {
                status: Some(status.as_u16()),
                message: "Failed to fetch food suggestions".to_string(),
            });
        }

        let body: InstantSearchResponse = response.json().await?;
        if body.common.is_none() && body.branded.is_none() {
            return Err(AnalysisError::MalformedResponse(
                "search response has neither common nor branded items".to_string(),
            ));
        }

        let suggestions: Vec<FoodSuggestion> = body
            .common
            .unwrap_or_default()
            .into_iter()
            .chain(body.branded.unwrap_or_default())
            .take(self.max_suggestions)
            .collect();

        debug!("{} suggestions for {:?}", suggestions.len(), query);
        Ok(suggestions)
    }
}
