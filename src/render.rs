//! Output formats for an analysis result: plain text for the terminal and an
//! HTML fragment for embedding in a page.

use html_escape::encode_text;
use std::fmt::Write;

use crate::model::NutritionResult;
use crate::nutritionix::FoodSuggestion;

/// Plain-text report
pub fn to_text(result: &NutritionResult) -> String {
    let mut out = String::new();
    let n = &result.nutrition;

    let _ = writeln!(out, "{}", result.food_name);
    let _ = writeln!(out, "Category: {}", result.category);
    let _ = writeln!(out, "Cuisine: {}", result.cuisine);
    let _ = writeln!(out, "Calories: {}", result.calories);
    out.push('\n');

    let _ = writeln!(out, "Nutritional Information");
    let _ = writeln!(out, "  Protein: {}", n.protein);
    let _ = writeln!(out, "  Carbs: {}", n.carbs);
    let _ = writeln!(out, "  Fat: {}", n.fat);
    if let Some(fiber) = &n.fiber {
        let _ = writeln!(out, "  Fiber: {}", fiber);
    }
    if let Some(sugar) = &n.sugar {
        let _ = writeln!(out, "  Sugar: {}", sugar);
    }

    text_list(&mut out, "Main Ingredients", &result.ingredients);
    text_list(&mut out, "Health Tips", &result.health_tips);
    text_list(&mut out, "Healthier Alternatives", &result.alternatives);

    out
}

fn text_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", title);
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

/// HTML fragment with one card per section. Every interpolated value is escaped.
pub fn to_html(result: &NutritionResult) -> String {
    let mut out = String::new();
    let n = &result.nutrition;

    out.push_str("<h4 class=\"mb-4\">Analysis Results</h4>\n");

    out.push_str("<div class=\"alert alert-info\">\n");
    let _ = writeln!(out, "  <h5 class=\"mb-3\">{}</h5>", encode_text(&result.food_name));
    html_field(&mut out, "Category", &result.category);
    html_field(&mut out, "Cuisine", &result.cuisine);
    html_field(&mut out, "Calories", &result.calories);
    out.push_str("</div>\n");

    out.push_str("<div class=\"alert alert-success\">\n");
    out.push_str("  <h5 class=\"mb-3\">Nutritional Information</h5>\n");
    html_field(&mut out, "Protein", &n.protein);
    html_field(&mut out, "Carbs", &n.carbs);
    html_field(&mut out, "Fat", &n.fat);
    if let Some(fiber) = &n.fiber {
        html_field(&mut out, "Fiber", fiber);
    }
    if let Some(sugar) = &n.sugar {
        html_field(&mut out, "Sugar", sugar);
    }
    out.push_str("</div>\n");

    html_list(&mut out, "alert-secondary", "Main Ingredients", &result.ingredients);
    html_list(&mut out, "alert-warning", "Health Tips", &result.health_tips);
    html_list(&mut out, "alert-info", "Healthier Alternatives", &result.alternatives);

    out
}

fn html_field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        out,
        "  <p class=\"mb-2\"><strong>{}:</strong> {}</p>",
        label,
        encode_text(value)
    );
}

fn html_list(out: &mut String, class: &str, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "<div class=\"alert {}\">", class);
    let _ = writeln!(out, "  <h5 class=\"mb-3\">{}</h5>", title);
    out.push_str("  <ul class=\"mb-0\">\n");
    for item in items {
        let _ = writeln!(out, "    <li>{}</li>", encode_text(item));
    }
    out.push_str("  </ul>\n</div>\n");
}

/// Dismissable error alert
pub fn error_html(message: &str) -> String {
    format!(
        "<div class=\"alert alert-danger alert-dismissible mt-3\" role=\"alert\">\n  \
         <i class=\"fas fa-exclamation-circle me-2\"></i>{}\n  \
         <button type=\"button\" class=\"btn-close\" data-bs-dismiss=\"alert\" aria-label=\"Close\"></button>\n\
         </div>\n",
        encode_text(message)
    )
}

/// One autocomplete row: name plus the serving line when known
pub fn suggestion_text(suggestion: &FoodSuggestion) -> String {
    match suggestion.serving_details() {
        Some(details) => format!("{} ({})", suggestion.display_name(), details),
        None => suggestion.display_name().to_string(),
    }
}
