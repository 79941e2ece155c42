use thiserror::Error;

use crate::camera::DeviceErrorKind;

/// Errors that can occur while analysing food or searching the nutrition database
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed user input, rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Non-success response (or transport failure) from an external API
    #[error(
        "Upstream service error{}: {}",
        .status.map(|s| format!(" ({s})")).unwrap_or_default(),
        .message
    )]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The response did not contain the expected JSON shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The verification stage decided the image does not show food
    #[error("This doesn't appear to be a food image. I see: {description}")]
    NotFood { description: String },

    /// The analysis stage returned neither a name nor a calorie estimate
    #[error("Could not identify the food. Please try with a clearer image or description.")]
    UnidentifiableFood,

    /// Camera could not be opened or read
    #[error("Could not access camera. {}", .0.message())]
    Device(DeviceErrorKind),

    /// The image could not be read or base64-encoded
    #[error("Failed to encode image: {0}")]
    Encoding(String),

    /// Preferences could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AnalysisError::MalformedResponse(err.to_string());
        }
        AnalysisError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<DeviceErrorKind> for AnalysisError {
    fn from(kind: DeviceErrorKind) -> Self {
        AnalysisError::Device(kind)
    }
}
