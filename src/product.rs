use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output languages a sheet can be written in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Fr, Language::En, Language::Es];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported language '{0}' (expected one of: fr, en, es)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Language::Fr),
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// The eight generated sections of a product sheet.
///
/// Used both for the sheet itself and for every entry of its translations, so
/// a translated sheet carries the same guarantees as the original.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetContent {
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    pub benefits: Vec<String>,
    pub price_suggestion: String,
    pub seo_tags: Vec<String>,
    pub category: String,
    pub cta: String,
}

/// A validated product sheet as returned by the generation pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSheet {
    #[serde(flatten)]
    pub content: SheetContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<Language, SheetContent>>,
}

impl ProductSheet {
    pub fn new(content: SheetContent) -> Self {
        Self {
            content,
            translations: None,
        }
    }

    /// The content in `language`, falling back to the primary content.
    pub fn in_language(&self, language: Language) -> &SheetContent {
        self.translations
            .as_ref()
            .and_then(|t| t.get(&language))
            .unwrap_or(&self.content)
    }
}
