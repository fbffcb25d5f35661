//! Migration steps and the orchestrator that sequences them.
//!
//! Each step is a free function over the [`crate::client::PdsAgent`] trait
//! so it can run against the production HTTP client or mocks. The
//! orchestrator never invokes a step on its own: it derives the pending
//! step from fresh status and leaves the side-effecting call to explicit
//! runner methods, so callers can present the decision before committing.

pub mod orchestrator;
pub mod progress;
pub mod steps;
pub mod types;

pub use orchestrator::MigrationOrchestrator;
pub use progress::{MigrationEvent, NoopReporter, ProgressReporter, TracingReporter};
pub use types::*;
