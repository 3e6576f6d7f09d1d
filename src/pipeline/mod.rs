pub mod events;
pub mod orchestrator;
pub mod state;

pub use events::{event_sink, AuditEvent};
pub use orchestrator::AuditOrchestrator;
pub use state::{AuditMetrics, RunState, RunStatus, RunSummary};
