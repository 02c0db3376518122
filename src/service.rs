use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::form::{FormError, SheetForm};
use crate::pipeline::{GenerationError, SheetPipeline};
use crate::product::ProductSheet;
use crate::vault::{SheetRecord, SheetStore, VaultError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("a generation is already running for this form")]
    Busy,
    #[error("sign in to access saved product sheets")]
    Unauthenticated,
    #[error(transparent)]
    Store(#[from] VaultError),
}

/// A generated sheet plus anything that went wrong after generation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub sheet: ProductSheet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub warnings: Vec<String>,
}

/// Keys with a generation in progress.
#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashSet<String>>,
}

impl InFlight {
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.insert(key.to_string()).then(|| InFlightGuard {
            owner: self,
            key: key.to_string(),
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key on drop, whichever way the generation ended.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Form → pipeline → store.
pub struct SheetService {
    pipeline: SheetPipeline,
    store: Arc<dyn SheetStore>,
    in_flight: InFlight,
}

impl SheetService {
    pub fn new(pipeline: SheetPipeline, store: Arc<dyn SheetStore>) -> Self {
        Self {
            pipeline,
            store,
            in_flight: InFlight::default(),
        }
    }

    pub fn is_generating(&self, user_id: &str) -> bool {
        self.in_flight.is_busy(user_id)
    }

    /// Validates the form, generates a sheet and, for signed-in users, saves it.
    ///
    /// A signed-in user has at most one generation in flight. Anonymous callers
    /// share no identity, so they are not limited. A failed save does not fail
    /// the call: the sheet is returned with a warning so it can still be shown
    /// and exported.
    pub async fn generate(&self, form: &SheetForm, user_id: Option<&str>) -> Result<GenerationOutcome, ServiceError> {
        form.validate()?;

        let _slot = match user_id {
            Some(user_id) => Some(self.in_flight.try_acquire(user_id).ok_or(ServiceError::Busy)?),
            None => None,
        };

        let sheet = self.pipeline.generate(&form.topic()).await?;

        let mut outcome = GenerationOutcome {
            sheet,
            record_id: None,
            warnings: Vec::new(),
        };

        if let Some(user_id) = user_id {
            match self.store.persist(user_id, &form.product_name, &outcome.sheet) {
                Ok(record) => {
                    info!(user_id, record_id = %record.id, "product sheet saved");
                    outcome.record_id = Some(record.id);
                }
                Err(e) => {
                    warn!(user_id, error = %e, "product sheet generated but not saved");
                    outcome
                        .warnings
                        .push(format!("The product sheet was generated but could not be saved: {e}"));
                }
            }
        }

        Ok(outcome)
    }

    pub fn saved(&self, user_id: Option<&str>) -> Result<Vec<SheetRecord>, ServiceError> {
        let user_id = user_id.ok_or(ServiceError::Unauthenticated)?;
        Ok(self.store.list(user_id)?)
    }

    pub fn record(&self, user_id: Option<&str>, id: &str) -> Result<SheetRecord, ServiceError> {
        let user_id = user_id.ok_or(ServiceError::Unauthenticated)?;
        Ok(self.store.fetch(user_id, id)?)
    }

    pub fn remove(&self, user_id: Option<&str>, id: &str) -> Result<(), ServiceError> {
        let user_id = user_id.ok_or(ServiceError::Unauthenticated)?;
        self.store.remove(user_id, id)?;
        info!(user_id, record_id = id, "product sheet removed");
        Ok(())
    }
}
