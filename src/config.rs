use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Generative-AI endpoint settings
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Nutrition database settings
    #[serde(default)]
    pub nutritionix: NutritionixConfig,
    /// Identity provider settings
    #[serde(default)]
    pub firebase: FirebaseConfig,
    /// Where the language preference is persisted
    #[serde(default)]
    pub preferences: PreferencesConfig,
    /// Request timeout in seconds. No timeout is applied when unset.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Configuration for the generative-AI endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: Option<String>,
    /// Base URL for the API (override for proxies and tests)
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// API version path segment
    #[serde(default = "default_gemini_api_version")]
    pub api_version: String,
    /// Model used for both image stages
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Model used for free-text analysis
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Token budget for the "is this food?" stage
    #[serde(default = "default_verification_max_tokens")]
    pub verification_max_tokens: u32,
    /// Token budget for the nutrition analysis stage
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            api_version: default_gemini_api_version(),
            image_model: default_image_model(),
            text_model: default_text_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            verification_max_tokens: default_verification_max_tokens(),
            analysis_max_tokens: default_analysis_max_tokens(),
        }
    }
}

/// Configuration for the nutrition database instant search
#[derive(Debug, Deserialize, Clone)]
pub struct NutritionixConfig {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    #[serde(default = "default_nutritionix_base_url")]
    pub base_url: String,
    #[serde(default = "default_remote_user_id")]
    pub remote_user_id: String,
    /// Maximum number of suggestions shown (common items first, then branded)
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Quiet period before a keystroke triggers a search
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Queries shorter than this never hit the network
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

impl Default for NutritionixConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            base_url: default_nutritionix_base_url(),
            remote_user_id: default_remote_user_id(),
            max_suggestions: default_max_suggestions(),
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
        }
    }
}

impl NutritionixConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration for the identity provider REST API
#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_firebase_base_url")]
    pub base_url: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_firebase_base_url(),
        }
    }
}

/// Configuration for the persisted user preferences
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PreferencesConfig {
    /// Preference file. Defaults to `<config dir>/nutriscan/preferences.json`.
    pub path: Option<PathBuf>,
}

impl PreferencesConfig {
    /// Resolve the preference file location
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("nutriscan")
                .join("preferences.json")
        })
    }
}

// Default value functions
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_api_version() -> String {
    "v1".to_string()
}

fn default_image_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_text_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_k() -> u32 {
    32
}

fn default_top_p() -> f32 {
    1.0
}

fn default_verification_max_tokens() -> u32 {
    1024
}

fn default_analysis_max_tokens() -> u32 {
    2048
}

fn default_nutritionix_base_url() -> String {
    "https://trackapi.nutritionix.com".to_string()
}

fn default_remote_user_id() -> String {
    "0".to_string()
}

fn default_max_suggestions() -> usize {
    8
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_len() -> usize {
    2
}

fn default_firebase_base_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with NUTRISCAN__ prefix
    /// 2. nutriscan.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: NUTRISCAN__GEMINI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the precedence rules.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("nutriscan").required(false))
        // Use double underscore for nested: NUTRISCAN__NUTRITIONIX__APP_ID
        .add_source(
            Environment::with_prefix("NUTRISCAN")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
