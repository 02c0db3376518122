pub mod config;
pub mod export;
pub mod form;
pub mod model;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod product;
pub mod prompt;
pub mod schema;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod vault;

pub use config::{Config, ConfigError};
pub use export::{ExportError, Exporter};
pub use form::{FormError, SheetForm};
pub use model::{ChatCompletionsModel, ChatModel, ModelError};
pub use parser::{SchemaViolation, SheetParser};
pub use pipeline::{GenerationError, RetryPolicy, SheetPipeline};
pub use product::{Language, ProductSheet, SheetContent};
pub use prompt::{ChatMessage, PromptTemplate, Role};
pub use service::{GenerationOutcome, ServiceError, SheetService};
pub use vault::{SheetRecord, SheetStore, SheetVault, VaultError};
