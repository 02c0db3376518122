use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::Language;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("please enter the product name")]
    MissingProductName,
}

/// What the user typed into the generator form.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetForm {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub language: Language,
}

impl SheetForm {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.product_name.trim().is_empty() {
            return Err(FormError::MissingProductName);
        }
        Ok(())
    }

    /// Free-text topic handed to the pipeline, e.g.
    /// `Trail shoes: light and grippy (Target public: runners) [Language: en]`.
    pub fn topic(&self) -> String {
        let mut topic = self.product_name.trim().to_string();

        let description = self.description.trim();
        if !description.is_empty() {
            topic.push_str(": ");
            topic.push_str(description);
        }

        let audience = self.target_audience.trim();
        if !audience.is_empty() {
            topic.push_str(&format!(" (Target public: {audience})"));
        }

        topic.push_str(&format!(" [Language: {}]", self.language));
        topic
    }
}
