/// Asks the model whether an image shows food.
///
/// Prompts are loaded from text files at compile time using `include_str!`
/// so they can be edited without dealing with Rust string syntax.
pub const VERIFY_IMAGE_PROMPT: &str = include_str!("verify_image.txt");

/// Requests structured nutrition data for an image. Contains a
/// `{{LANGUAGE}}` placeholder.
pub const ANALYZE_IMAGE_PROMPT: &str = include_str!("analyze_image.txt");

/// Requests structured nutrition data for a free-text description. Contains
/// `{{LANGUAGE}}` and `{{FOOD}}` placeholders.
pub const ANALYZE_TEXT_PROMPT: &str = include_str!("analyze_text.txt");

/// Fill the image analysis prompt with the response language.
pub fn image_analysis_prompt(language: &str) -> String {
    ANALYZE_IMAGE_PROMPT.replace("{{LANGUAGE}}", language)
}

/// Fill the text analysis prompt with the response language and the food.
pub fn text_analysis_prompt(description: &str, language: &str) -> String {
    ANALYZE_TEXT_PROMPT
        .replace("{{LANGUAGE}}", language)
        .replace("{{FOOD}}", description)
}
