#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qwickfiche::{
    ChatMessage, ChatModel, ModelError, ProductSheet, SheetPipeline, SheetRecord, SheetService, SheetStore,
    SheetVault, VaultError,
};

pub const EARBUDS_ANSWER: &str = r#"Here is the product sheet you asked for:

```json
{
  "title": "Wireless Noise-Cancelling Earbuds",
  "description": "Compact earbuds with active noise cancellation and all-day battery life.",
  "features": ["Active noise cancellation", "Bluetooth 5.3", "30 h total battery", "IPX4 splash resistance"],
  "benefits": ["Focus anywhere", "Fewer recharges", "Comfortable for long commutes"],
  "priceSuggestion": "79 EUR, positioned below flagship earbuds with comparable ANC",
  "seoTags": ["wireless earbuds", "noise cancelling", "bluetooth earbuds", "anc", "true wireless"],
  "category": "Electronics",
  "cta": "Buy now and enjoy the silence"
}
```"#;

/// Answers every request with the same text, counting calls.
pub struct CannedModel {
    answer: Result<String, ModelError>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl CannedModel {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: ModelError) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.clone()
    }
}

/// A store whose writes always fail.
pub struct BrokenStore;

impl SheetStore for BrokenStore {
    fn persist(&self, _: &str, _: &str, _: &ProductSheet) -> Result<SheetRecord, VaultError> {
        Err(VaultError::Storage(sled::Error::Unsupported("read-only".to_string())))
    }

    fn fetch(&self, _: &str, _: &str) -> Result<SheetRecord, VaultError> {
        Err(VaultError::NotFound)
    }

    fn list(&self, _: &str) -> Result<Vec<SheetRecord>, VaultError> {
        Ok(Vec::new())
    }

    fn remove(&self, _: &str, _: &str) -> Result<(), VaultError> {
        Err(VaultError::NotFound)
    }
}

pub fn service_with(model: Arc<CannedModel>) -> SheetService {
    let pipeline = SheetPipeline::new(model).expect("schema compiles");
    SheetService::new(pipeline, Arc::new(SheetVault::temporary().expect("temporary db")))
}
