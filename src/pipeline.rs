use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::model::{ChatModel, ModelError};
use crate::parser::{SchemaViolation, SheetParser};
use crate::product::ProductSheet;
use crate::prompt::PromptTemplate;

/// Why a generation produced no sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("topic is empty")]
    InvalidTopic,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("model authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("model quota exceeded: {0}")]
    Quota(String),
    #[error("model endpoint error ({status}): {message}")]
    Endpoint { status: u16, message: String },
    #[error("model answer does not conform to the sheet schema: {0}")]
    Schema(#[from] SchemaViolation),
}

impl From<ModelError> for GenerationError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Transport(msg) => Self::Transport(msg),
            ModelError::Auth { status, message } => Self::Auth { status, message },
            ModelError::Quota(msg) => Self::Quota(msg),
            ModelError::Endpoint { status, message } => Self::Endpoint { status, message },
        }
    }
}

/// Retries for transport failures only. Off unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << attempt.min(6))
    }
}

/// Topic in, validated [`ProductSheet`] out.
pub struct SheetPipeline {
    model: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
    parser: SheetParser,
    retry: RetryPolicy,
}

impl SheetPipeline {
    pub fn new(model: Arc<dyn ChatModel>) -> Result<Self, GenerationError> {
        Ok(Self {
            model,
            prompt: PromptTemplate::new(),
            parser: SheetParser::new()?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn generate(&self, topic: &str) -> Result<ProductSheet, GenerationError> {
        if topic.trim().is_empty() {
            return Err(GenerationError::InvalidTopic);
        }

        let messages = self.prompt.render(topic);
        let started = Instant::now();
        info!(model = self.model.name(), "requesting product sheet");

        let mut attempt = 0;
        let raw = loop {
            match self.model.complete(&messages).await {
                Ok(raw) => break raw,
                Err(ModelError::Transport(msg)) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    attempt += 1;
                    warn!(attempt, error = %msg, delay_ms = delay.as_millis() as u64, "model transport failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(model = self.model.name(), error = %e, "model call failed");
                    return Err(e.into());
                }
            }
        };

        let sheet = self.parser.parse(&raw).inspect_err(|e| {
            warn!(model = self.model.name(), error = %e, "model answer rejected");
        })?;

        info!(
            model = self.model.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            features = sheet.content.features.len(),
            seo_tags = sheet.content.seo_tags.len(),
            "product sheet generated"
        );
        Ok(sheet)
    }
}
