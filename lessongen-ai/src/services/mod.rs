//! Generation services
//!
//! - Source selection registry and settings store (session inputs)
//! - Progress reconciliation and auto titles (pure helpers)
//! - Generation orchestrator (the session state machine)

pub mod auto_title;
pub mod orchestrator;
pub mod reconciliation;
pub mod settings_store;
pub mod source_registry;

pub use auto_title::{auto_title, AUTO_TITLE_MARKER};
pub use orchestrator::{
    EventDisposition, GenerateOutcome, GenerationOrchestrator, NotReadyReason, PersistOutcome,
};
pub use reconciliation::{reconcile, IgnoreReason, ProgressDecision};
pub use settings_store::GenerationSettingsStore;
pub use source_registry::SourceSelectionRegistry;
