use serde::{Deserialize, Serialize};

use crate::schema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

const SYSTEM_TEMPLATE: &str = "You are a highly skilled assistant specialized in crafting professional and SEO-optimized product sheets for global e-commerce platforms.
Your task is to generate a complete and compelling product sheet based on the input provided.

The product sheet must follow this structure:
- Title: A short and clear product name
- Description: A persuasive and informative marketing description written in natural language
- Features: A bullet-point list of technical or practical features (max 7)
- Benefits: A bullet-point list of the main customer benefits
- PriceSuggestion: A price suggestion with a brief justification
- SEO Tags: 5 to 10 keywords relevant for search engines
- Category: The most relevant category based on the product type
- CTA: A strong call-to-action (e.g., Buy now, Add to cart, etc.)

Language: write every field in the language given by the [Language: xx] tag of the input.
Translations: only if the input explicitly asks for other languages, add them under the 'translations' field, keyed by language code (fr, en, es), each entry carrying the same eight fields.

Output the product sheet as structured JSON.

Formatting Instructions: {format_instructions}";

const HUMAN_TEMPLATE: &str = "Generate a product sheet for this product: {input}";

/// System + human message pair for a sheet request.
///
/// The rendered text is fixed apart from the topic, so the formatting
/// instructions the model sees always match what the parser enforces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::with_format_instructions(&schema::format_instructions())
    }

    pub fn with_format_instructions(instructions: &str) -> Self {
        Self {
            system: SYSTEM_TEMPLATE.replace("{format_instructions}", instructions),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn render(&self, topic: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(HUMAN_TEMPLATE.replace("{input}", topic.trim())),
        ]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new()
    }
}
