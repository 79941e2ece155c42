use log::error;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AnalysisError;

/// Locate and parse the JSON object embedded in free-form model output.
///
/// The object is taken to span from the first `{` to the last `}` in the
/// text. This is not a balanced-brace scan: two sibling objects in one block
/// produce a slice that fails to parse.
pub fn extract_json(text: &str) -> Result<Value, AnalysisError> {
    let slice = json_slice(text).ok_or_else(|| {
        error!("No JSON found in model response: {}", text);
        AnalysisError::MalformedResponse("No JSON object found in response".to_string())
    })?;

    serde_json::from_str(slice).map_err(|e| {
        error!("Error parsing model response: {}", text);
        AnalysisError::MalformedResponse(format!("Failed to parse response JSON: {}", e))
    })
}

/// Like [`extract_json`], then deserialize into `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Result<T, AnalysisError> {
    let value = extract_json(text)?;
    serde_json::from_value(value)
        .map_err(|e| AnalysisError::MalformedResponse(format!("Unexpected response shape: {}", e)))
}

fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
