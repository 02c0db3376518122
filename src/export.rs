use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::pdf;
use crate::product::ProductSheet;

pub const PDF_FILE_NAME: &str = "product_sheet.pdf";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// `fiche-produit-<unix millis>.json`
pub fn json_file_name(at: DateTime<Utc>) -> String {
    format!("fiche-produit-{}.json", at.timestamp_millis())
}

/// Pretty-printed JSON, the same bytes the download carries.
pub fn to_json(sheet: &ProductSheet) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(sheet)?)
}

pub fn from_json(raw: &str) -> Result<ProductSheet, ExportError> {
    Ok(serde_json::from_str(raw)?)
}

/// Writes export files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf, ExportError> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let mut file = fs::File::create(&path)?;
        file.write_all(data)?;
        tracing::info!(path = %path.display(), bytes = data.len(), "export written");
        Ok(path)
    }

    pub fn write_json(&self, sheet: &ProductSheet) -> Result<PathBuf, ExportError> {
        self.write(&json_file_name(Utc::now()), to_json(sheet)?.as_bytes())
    }

    pub fn write_pdf(&self, sheet: &ProductSheet) -> Result<PathBuf, ExportError> {
        self.write(PDF_FILE_NAME, &pdf::render(sheet)?)
    }
}
