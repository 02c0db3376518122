//! The declared shape of a product sheet.
//!
//! The same JSON Schema is shown to the model as formatting instructions and
//! used by the parser to validate what comes back.

use serde_json::{Value, json};

use crate::product::Language;

pub const MAX_FEATURES: usize = 7;
pub const MIN_SEO_TAGS: usize = 5;
pub const MAX_SEO_TAGS: usize = 10;

/// Required fields, in the order they are presented to the model.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "title",
    "description",
    "features",
    "benefits",
    "priceSuggestion",
    "seoTags",
    "category",
    "cta",
];

pub const STRING_FIELDS: [&str; 5] = ["title", "description", "priceSuggestion", "category", "cta"];
pub const LIST_FIELDS: [&str; 3] = ["features", "benefits", "seoTags"];

fn text(description: &str) -> Value {
    json!({ "type": "string", "minLength": 1, "description": description })
}

fn list(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string", "minLength": 1 },
        "description": description
    })
}

/// Schema for the eight-field content block.
pub fn content_schema() -> Value {
    let mut features = list("List of product features or technical specifications");
    features["maxItems"] = json!(MAX_FEATURES);

    let mut benefits = list("Customer benefits - what the user gains by using the product");
    benefits["minItems"] = json!(1);

    let mut seo_tags = list("List of SEO keywords to optimize product visibility");
    seo_tags["minItems"] = json!(MIN_SEO_TAGS);
    seo_tags["maxItems"] = json!(MAX_SEO_TAGS);

    json!({
        "type": "object",
        "properties": {
            "title": text("Main product title (e.g., 'Galaxy S21 Smartphone')"),
            "description": text("Detailed marketing description of the product"),
            "features": features,
            "benefits": benefits,
            "priceSuggestion": text("Suggested price for the product (can include currency) with a brief justification"),
            "seoTags": seo_tags,
            "category": text("Product category (e.g., electronics, fashion, home)"),
            "cta": text("Call-to-action (e.g., 'Buy Now', 'Add to Cart', 'Learn More')"),
        },
        "required": REQUIRED_FIELDS,
    })
}

/// Schema for a full sheet: the content block plus optional translations.
pub fn sheet_schema() -> Value {
    let codes: Vec<&str> = Language::ALL.iter().map(Language::code).collect();

    let mut schema = content_schema();
    schema["$schema"] = json!("http://json-schema.org/draft-07/schema#");
    schema["properties"]["translations"] = json!({
        "type": "object",
        "description": "Optional translated sheets keyed by language code, each with the same fields",
        "propertyNames": { "enum": codes },
        "additionalProperties": content_schema(),
    });
    schema
}

/// Instructions appended to the system prompt so the model answers in a
/// shape the parser can read.
pub fn format_instructions() -> String {
    let schema = serde_json::to_string_pretty(&sheet_schema()).unwrap_or_default();
    format!(
        "You must format your output as a JSON value that adheres to the JSON Schema below. \
Your output will be parsed and type-checked against this schema, so every required field \
must be present with the right type and there must be no trailing commas or comments. \
Answer with the JSON only, wrapped in a markdown code block:\n```json\n{schema}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_compiles() {
        assert!(jsonschema::validator_for(&sheet_schema()).is_ok());
    }

    #[test]
    fn translations_are_optional() {
        let schema = sheet_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, REQUIRED_FIELDS);
        assert!(!required.contains(&"translations"));
        assert!(schema["properties"]["translations"].is_object());
    }

    #[test]
    fn instructions_embed_the_schema() {
        let instructions = format_instructions();
        assert!(instructions.contains("```json"));
        assert!(instructions.contains("\"seoTags\""));
        assert!(instructions.contains("\"maxItems\": 7"));
    }
}
