use std::collections::BTreeMap;
use std::path::Path;

use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use thiserror::Error;

use crate::product::{Language, ProductSheet, SheetContent};

const TREE: &str = "product_sheets";

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Corrupt record: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Product sheet not found")]
    NotFound,
    #[error("Invalid user id: {0:?}")]
    InvalidUser(String),
}

/// One saved generation, as stored in the `product_sheets` tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SheetRecord {
    pub id: String,
    pub user_id: String,
    pub product_input_name: String,
    pub generated_title: String,
    pub description: String,
    pub features: Vec<String>,
    pub benefits: Vec<String>,
    pub price_suggestion: String,
    pub seo_tags: Vec<String>,
    pub category: String,
    pub cta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<Language, SheetContent>>,
    pub created_at: DateTime<Utc>,
}

impl SheetRecord {
    pub fn new(user_id: &str, product_input_name: &str, sheet: &ProductSheet, created_at: DateTime<Utc>) -> Self {
        let content = &sheet.content;
        let mut record = Self {
            id: String::new(),
            user_id: user_id.to_string(),
            product_input_name: product_input_name.trim().to_string(),
            generated_title: content.title.clone(),
            description: content.description.clone(),
            features: content.features.clone(),
            benefits: content.benefits.clone(),
            price_suggestion: content.price_suggestion.clone(),
            seo_tags: content.seo_tags.clone(),
            category: content.category.clone(),
            cta: content.cta.clone(),
            translations: sheet.translations.clone(),
            created_at,
        };
        record.id = record.content_hash();
        record
    }

    /// BLAKE3 over owner, timestamp and generated content.
    fn content_hash(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(self.user_id.as_bytes());
        hasher.update(self.created_at.to_rfc3339().as_bytes());
        if let Ok(sheet) = serde_json::to_vec(&self.sheet()) {
            hasher.update(&sheet);
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn sheet(&self) -> ProductSheet {
        ProductSheet {
            content: SheetContent {
                title: self.generated_title.clone(),
                description: self.description.clone(),
                features: self.features.clone(),
                benefits: self.benefits.clone(),
                price_suggestion: self.price_suggestion.clone(),
                seo_tags: self.seo_tags.clone(),
                category: self.category.clone(),
                cta: self.cta.clone(),
            },
            translations: self.translations.clone(),
        }
    }
}

/// Where generated sheets are saved.
pub trait SheetStore: Send + Sync {
    fn persist(&self, user_id: &str, product_input_name: &str, sheet: &ProductSheet) -> Result<SheetRecord, VaultError>;
    fn fetch(&self, user_id: &str, id: &str) -> Result<SheetRecord, VaultError>;
    fn list(&self, user_id: &str) -> Result<Vec<SheetRecord>, VaultError>;
    fn remove(&self, user_id: &str, id: &str) -> Result<(), VaultError>;
}

/// sled-backed [`SheetStore`]. Keys are `<user_id>/<record id>`.
#[derive(Clone)]
pub struct SheetVault {
    tree: Tree,
}

impl SheetVault {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        Self::from_db(sled::open(path)?)
    }

    /// A throwaway database, removed when dropped.
    pub fn temporary() -> Result<Self, VaultError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, VaultError> {
        Ok(Self {
            tree: db.open_tree(TREE)?,
        })
    }

    fn key(user_id: &str, id: &str) -> Result<Vec<u8>, VaultError> {
        Ok(format!("{}{id}", Self::prefix(user_id)?).into_bytes())
    }

    fn prefix(user_id: &str) -> Result<String, VaultError> {
        if user_id.trim().is_empty() || user_id.contains('/') {
            return Err(VaultError::InvalidUser(user_id.to_string()));
        }
        Ok(format!("{user_id}/"))
    }
}

impl SheetStore for SheetVault {
    fn persist(&self, user_id: &str, product_input_name: &str, sheet: &ProductSheet) -> Result<SheetRecord, VaultError> {
        let record = SheetRecord::new(user_id, product_input_name, sheet, Utc::now());
        let key = Self::key(user_id, &record.id)?;
        self.tree.insert(key, serde_json::to_vec(&record)?)?;
        self.tree.flush()?;
        Ok(record)
    }

    fn fetch(&self, user_id: &str, id: &str) -> Result<SheetRecord, VaultError> {
        match self.tree.get(Self::key(user_id, id)?)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Err(VaultError::NotFound),
        }
    }

    /// Newest first.
    fn list(&self, user_id: &str) -> Result<Vec<SheetRecord>, VaultError> {
        let mut records = self
            .tree
            .scan_prefix(Self::prefix(user_id)?)
            .values()
            .map(|data| -> Result<SheetRecord, VaultError> { Ok(serde_json::from_slice(&data?)?) })
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn remove(&self, user_id: &str, id: &str) -> Result<(), VaultError> {
        match self.tree.remove(Self::key(user_id, id)?)? {
            Some(_) => Ok(()),
            None => Err(VaultError::NotFound),
        }
    }
}
