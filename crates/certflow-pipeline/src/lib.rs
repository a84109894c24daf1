pub mod config;
pub mod data;
pub mod delivery;
pub mod documents;
pub mod error;
pub mod generation;
pub mod orchestrator;
pub mod status;

pub use config::{BrandingConfig, MergePrecedence, PipelineConfig};
pub use delivery::{DeliveryReport, DeliveryWorker};
pub use documents::DocumentStore;
pub use error::{PipelineError, Result};
pub use generation::{GenerationReport, GenerationWorker};
pub use orchestrator::{EnqueueSummary, EventUpdate, EventUpdated, NewEvent, Orchestrator};
pub use status::StatusAggregator;
