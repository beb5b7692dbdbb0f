//! Page reconciliation and document orchestration.

mod engine;
mod orchestrator;

pub use engine::{PageDisposition, ReconciliationEngine};
pub use orchestrator::{ScanOrchestrator, ScanReport};
