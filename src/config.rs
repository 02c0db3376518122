//! Runtime configuration.
//!
//! Resolved once at startup: built-in defaults, then an optional YAML file,
//! then `QWICKFICHE_*` environment variables (a `.env` file is loaded first).
//! The model credential only ever comes from the file or the environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::product::Language;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no model credential configured (set QWICKFICHE_API_KEY or GROQ_API_KEY)")]
    MissingCredential,
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub credential: Option<String>,
    pub language: Language,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub bind: String,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            credential: None,
            language: Language::Fr,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            max_retries: 0,
            temperature: 0.7,
            db_path: PathBuf::from("qwickfiche_db"),
            export_dir: PathBuf::from("exports"),
            bind: "127.0.0.1:8080".to_string(),
            static_dir: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("temperature", &self.temperature)
            .field("db_path", &self.db_path)
            .field("export_dir", &self.export_dir)
            .field("bind", &self.bind)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl Config {
    /// Defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };

        config.apply_vars(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overrides fields from variables resolved through `lookup`.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("QWICKFICHE_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("QWICKFICHE_API_KEY").or_else(|| lookup("GROQ_API_KEY")) {
            self.credential = Some(v);
        }
        if let Some(v) = lookup("QWICKFICHE_LANGUAGE") {
            self.language = v.parse().map_err(|e: crate::product::UnknownLanguage| ConfigError::Invalid {
                key: "language",
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup("QWICKFICHE_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("QWICKFICHE_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("timeout_secs", &v)?;
        }
        if let Some(v) = lookup("QWICKFICHE_MAX_RETRIES") {
            self.max_retries = parse_number("max_retries", &v)?;
        }
        if let Some(v) = lookup("QWICKFICHE_TEMPERATURE") {
            self.temperature = parse_number("temperature", &v)?;
        }
        if let Some(v) = lookup("QWICKFICHE_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("QWICKFICHE_EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("QWICKFICHE_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("QWICKFICHE_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn credential(&self) -> Result<&str, ConfigError> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingCredential)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_groq() {
        let config = Config::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 0);
        assert!(matches!(config.credential(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn yaml_overrides_only_given_fields() {
        let config = Config::from_yaml_str("model: mixtral\nlanguage: es\nmax_retries: 2\n").unwrap();
        assert_eq!(config.model, "mixtral");
        assert_eq!(config.language, Language::Es);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn environment_wins_over_file() {
        let vars: HashMap<&str, &str> = [
            ("QWICKFICHE_MODEL", "llama-3.1-8b-instant"),
            ("GROQ_API_KEY", "gsk_test"),
            ("QWICKFICHE_LANGUAGE", "EN"),
            ("QWICKFICHE_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::from_yaml_str("model: mixtral\n").unwrap();
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.credential().unwrap(), "gsk_test");
        assert_eq!(config.language, Language::En);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let mut config = Config::default();
        let err = config
            .apply_vars(|k| (k == "QWICKFICHE_MAX_RETRIES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "max_retries", .. }));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let config = Config {
            credential: Some("gsk_secret".to_string()),
            ..Config::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("gsk_secret"));
        assert!(printed.contains("<redacted>"));
    }
}
