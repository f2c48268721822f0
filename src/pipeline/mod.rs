//! Parallel, resumable execution of the stage list over a project's snapshots.

/// Commit concatenation and fallback ordering.
pub mod concat;
pub(crate) mod executor;
/// Progress sinks.
pub mod reporter;
/// Run orchestration.
pub mod scheduler;
pub(crate) mod workdir;

pub use concat::attempt_order;
pub use executor::Executor;
pub use reporter::{Reporter, TerminalReporter, TracingReporter};
pub use scheduler::{RunSummary, Scheduler, can_run};
pub use workdir::{WorkDirLease, WorkDirPool, WorkDirPoolStats};
