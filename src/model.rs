use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AnalysisError;

pub const UNKNOWN_FOOD: &str = "Unknown food";
pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";
pub const NA: &str = "N/A";

/// Normalized nutrition data produced by either analysis pipeline.
///
/// Every field is populated: values missing from the model output are
/// replaced by a sentinel at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionResult {
    pub food_name: String,
    pub calories: String,
    pub ingredients: Vec<String>,
    pub nutrition: Nutrition,
    pub category: String,
    pub cuisine: String,
    #[serde(default)]
    pub health_tips: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// Macronutrient breakdown. `fiber` and `sugar` are only requested by the
/// text pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub protein: String,
    pub carbs: String,
    pub fat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<String>,
}

/// Answer to "does this image show food?"
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub is_food: bool,
    pub description: String,
}

impl VerificationResult {
    /// Only an explicit `true` counts as food; a missing or null
    /// description reads as empty.
    pub fn from_model_output(raw: &Value) -> Self {
        VerificationResult {
            is_food: raw.get("isFood").and_then(Value::as_bool) == Some(true),
            description: scalar(raw.get("description")).unwrap_or_default(),
        }
    }
}

/// Which prompt produced the raw object; decides the fiber/sugar defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Image,
    Text,
}

impl NutritionResult {
    /// Build a result from the JSON object the model returned.
    ///
    /// Fails with [`AnalysisError::UnidentifiableFood`] when the object has
    /// neither a usable name nor a usable calorie estimate.
    pub fn from_model_output(raw: &Value, kind: AnalysisKind) -> Result<Self, AnalysisError> {
        let name = scalar(raw.get("name"));
        let calories = scalar(raw.get("calories"));
        if name.is_none() && calories.is_none() {
            return Err(AnalysisError::UnidentifiableFood);
        }

        Ok(NutritionResult {
            food_name: name.unwrap_or_else(|| UNKNOWN_FOOD.to_string()),
            calories: calories.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ingredients: sequence(raw.get("ingredients"))
                .unwrap_or_else(|| vec![NOT_AVAILABLE.to_string()]),
            nutrition: Nutrition::from_model_output(raw.get("nutrition"), kind),
            category: scalar(raw.get("category")).unwrap_or_else(|| UNKNOWN.to_string()),
            cuisine: scalar(raw.get("cuisine")).unwrap_or_else(|| UNKNOWN.to_string()),
            health_tips: sequence(raw.get("healthTips")).unwrap_or_default(),
            alternatives: sequence(raw.get("alternatives")).unwrap_or_default(),
        })
    }
}

impl Nutrition {
    fn from_model_output(raw: Option<&Value>, kind: AnalysisKind) -> Self {
        let field = |key: &str| scalar(raw.and_then(|n| n.get(key)));
        let required = |key: &str| field(key).unwrap_or_else(|| NA.to_string());

        let (fiber, sugar) = match kind {
            AnalysisKind::Text => (Some(required("fiber")), Some(required("sugar"))),
            AnalysisKind::Image => (field("fiber"), field("sugar")),
        };

        Nutrition {
            protein: required("protein"),
            carbs: required("carbs"),
            fat: required("fat"),
            fiber,
            sugar,
        }
    }
}

/// A string or number, with blank strings treated as absent.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An array of scalars. Anything that is not an array yields `None`.
fn sequence(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    )
}
